//! Device firmware generation.

/// Record-layout family of a device's firmware.
///
/// Older firmware stores compact 28-byte user records with numeric user
/// ids; newer firmware stores 72-byte records with free-text identifiers.
/// The generation is guessed from the transport mode at connect time and
/// pinned after the first successful user read, when the true stride is
/// known from the declared record count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceGeneration {
    /// 28-byte user records, numeric user ids.
    Compact,
    /// 72-byte user records, text user ids.
    Extended,
}

impl DeviceGeneration {
    /// Byte width of one user record in bulk payloads.
    pub fn user_record_len(self) -> usize {
        match self {
            DeviceGeneration::Compact => 28,
            DeviceGeneration::Extended => 72,
        }
    }

    /// Resolve a generation from an observed user-record stride.
    pub fn from_user_stride(stride: usize) -> Option<Self> {
        match stride {
            28 => Some(DeviceGeneration::Compact),
            72 => Some(DeviceGeneration::Extended),
            _ => None,
        }
    }

    /// Maximum password length accepted by `set_user` for this generation.
    pub fn password_len(self) -> usize {
        match self {
            DeviceGeneration::Compact => 5,
            DeviceGeneration::Extended => 8,
        }
    }
}

//! Attendance punch records.

use std::fmt;

use chrono::NaiveDateTime;

/// One attendance event read from the terminal's log or the live stream.
///
/// Attendance is read-only: records are produced by the device and never
/// uploaded. `uid` is resolved best-effort against the user list loaded at
/// the start of the read; when no user matches, the raw identifier is
/// carried over as the uid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendance {
    pub uid: u16,
    pub user_id: String,
    pub timestamp: NaiveDateTime,
    /// Verify-method code (fingerprint, password, card, ...).
    pub status: u8,
    /// Check-in/out code; 0 on firmware that does not record it.
    pub punch: u8,
}

impl Attendance {
    pub fn new(
        uid: u16,
        user_id: impl Into<String>,
        timestamp: NaiveDateTime,
        status: u8,
        punch: u8,
    ) -> Self {
        Self {
            uid,
            user_id: user_id.into(),
            timestamp,
            status,
            punch,
        }
    }
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Attendance[{}] {} status={} punch={}",
            self.user_id, self.timestamp, self.status, self.punch
        )
    }
}

//! Error types for bioterm-core

/// Result type alias for core protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Packet is too short to be valid
    #[error("Packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort { expected: usize, actual: usize },

    /// Unknown command code
    #[error("Unknown command code: {0}")]
    UnknownCommand(u16),

    /// Invalid session state transition
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// Session not initialized
    #[error("Session not initialized - connect to device first")]
    SessionNotInitialized,

    /// Packed timestamp names a date that does not exist
    #[error("Invalid packed timestamp: {0}")]
    InvalidTimestamp(u32),

    /// Year outside the range the packed clock can represent
    #[error("Year {0} outside packed clock range 2000-2099")]
    TimestampOutOfRange(i32),

    /// Bulk payload too short for the stride dictated by the declared count
    #[error("Data integrity error decoding {what}: {detail}")]
    DataIntegrity {
        what: &'static str,
        detail: String,
    },

    /// No known record layout matches the observed stride
    #[error("Unknown {what} record stride: {stride} bytes")]
    UnknownStride { what: &'static str, stride: usize },

    /// A field does not fit the wire record for the target generation
    #[error("Cannot encode field {field}: {detail}")]
    FieldEncoding {
        field: &'static str,
        detail: String,
    },
}

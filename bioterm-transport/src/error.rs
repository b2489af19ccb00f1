//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Read timeout")]
    ReadTimeout,

    #[error("Connection closed by remote")]
    ConnectionClosed,

    /// TCP outer-frame magic mismatch: the stream is out of sync.
    #[error("Invalid frame header: {0:02X?}")]
    InvalidFrame([u8; 8]),

    #[error("Frame too short: declared {declared} bytes, stream ended at {received}")]
    TruncatedFrame { declared: usize, received: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl Error {
    /// Framing failures mean the byte stream is desynchronized; network
    /// failures mean the socket itself gave out. Callers report them as
    /// distinct kinds.
    pub fn is_framing(&self) -> bool {
        matches!(self, Self::InvalidFrame(_) | Self::TruncatedFrame { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout | Self::ConnectionTimeout)
    }
}

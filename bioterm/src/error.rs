//! Error types for high-level device operations.

use bioterm_core::Command;
use thiserror::Error;

/// Errors returned by [`Device`](crate::Device) operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Protocol-layer failure (framing, codec, session bookkeeping).
    #[error("protocol error: {0}")]
    Core(#[from] bioterm_core::Error),

    /// Transport-layer failure (socket, timeout, TCP framing).
    #[error("transport error: {0}")]
    Transport(#[from] bioterm_transport::Error),

    /// An operation was attempted before `connect` succeeded.
    #[error("not connected to device")]
    NotConnected,

    /// The device rejected the supplied communication password.
    #[error("device authentication failed")]
    AuthenticationFailed,

    /// The device answered a command with a non-success reply code.
    #[error("device refused {command:?} with reply code {code:#06x}")]
    Refused { command: Command, code: u16 },

    /// A bulk transfer aborted or produced inconsistent data.
    #[error("bulk transfer failed during {command:?}: {detail}")]
    Transfer { command: Command, detail: String },

    /// A reply arrived but its payload did not have the expected shape.
    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// No user record with the given internal uid exists on the device.
    #[error("no user with uid {0} on device")]
    UserNotFound(u16),
}

impl Error {
    /// Whether this error was caused by a read or connect timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! # bioterm-core
//!
//! Core protocol implementation for standalone biometric access-control
//! terminals.
//!
//! This crate provides the low-level protocol primitives:
//! - Packet envelope encoding/decoding and the TCP outer frame
//! - Checksum calculation
//! - Command definitions
//! - CommKey authentication scramble
//! - Packed clock codec
//! - Binary record codecs (users, attendance, fingerprint templates)
//! - Session bookkeeping

pub mod auth;
pub mod checksum;
pub mod clock;
pub mod codec;
pub mod command;
pub mod constants;
pub mod error;
pub mod packet;
pub mod session;

pub use command::Command;
pub use error::{Error, Result};
pub use packet::Packet;
pub use session::{Session, SessionState};

/// Default device port
pub const DEFAULT_PORT: u16 = 4370;

/// Maximum packet size (64KB)
pub const MAX_PACKET_SIZE: usize = 65535;

/// Packet header size
pub const HEADER_SIZE: usize = 8;

//! Transport layer for the terminal protocol
//!
//! Owns one UDP or TCP socket to a fixed (address, port) and exchanges
//! *logical frames*: complete protocol envelopes. Over UDP one datagram is
//! one frame; over TCP every envelope travels inside an 8-byte
//! length-prefixed outer frame, and this layer hides stream fragmentation
//! and coalescing from everything above it.

pub mod error;
pub mod tcp;
pub mod udp;

pub use error::{Error, Result};
pub use tcp::{FrameAssembler, TcpTransport};
pub use udp::UdpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for the two socket modes
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect the socket
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect and release the socket
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send one envelope (TCP transports add the outer frame)
    async fn send_frame(&mut self, envelope: &[u8]) -> Result<()>;

    /// Receive one logical envelope, waiting at most `timeout`
    async fn recv_frame(&mut self, timeout: Duration) -> Result<BytesMut>;

    /// Whether envelopes travel inside the TCP outer frame
    fn is_tcp(&self) -> bool;

    /// Get remote address
    fn remote_addr(&self) -> String;
}

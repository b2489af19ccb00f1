//! TCP transport with logical-frame reassembly

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use bioterm_core::constants::TCP_FRAME_HEADER;
use bioterm_core::Packet;

use crate::{error::*, Transport};

/// Reassembles logical frames out of an arbitrarily-fragmented byte stream.
///
/// A single socket read may deliver part of a frame, or a frame and a half;
/// bytes belonging to the next frame are retained rather than discarded.
/// Pure (no I/O), so fragmentation behavior is testable on its own.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Feed raw bytes as they came off the socket.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete envelope, outer frame stripped.
    ///
    /// Returns `Ok(None)` when more bytes are needed, and a framing error
    /// when the buffered bytes do not start with the magic words.
    pub fn next_frame(&mut self) -> Result<Option<BytesMut>> {
        if self.buf.len() < TCP_FRAME_HEADER {
            return Ok(None);
        }

        let mut header = [0u8; TCP_FRAME_HEADER];
        header.copy_from_slice(&self.buf[..TCP_FRAME_HEADER]);
        let length = Packet::unwrap_tcp(&header) as usize;
        if length == 0 {
            return Err(Error::InvalidFrame(header));
        }

        if self.buf.len() < TCP_FRAME_HEADER + length {
            return Ok(None);
        }

        self.buf.advance(TCP_FRAME_HEADER);
        Ok(Some(self.buf.split_to(length)))
    }

    /// Bytes sitting in the buffer, complete or not.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// TCP transport
pub struct TcpTransport {
    addr: String,
    port: u16,
    socket_addr: Option<SocketAddr>,
    stream: Option<TcpStream>,
    assembler: FrameAssembler,
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            socket_addr: None,
            stream: None,
            assembler: FrameAssembler::new(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.socket_addr {
            return Ok(addr);
        }

        let addr_str = format!("{}:{}", self.addr, self.port);

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .collect();

        let addr = addrs
            .first()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))?;

        self.socket_addr = Some(*addr);
        Ok(*addr)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let addr = self.resolve_addr().await?;

        debug!("Connecting to {}...", addr);

        let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(Error::Io)?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        debug!("Connected to {}", addr);

        self.assembler = FrameAssembler::new();
        self.stream = Some(stream);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Disconnecting from {}...", self.remote_addr());

            // Graceful shutdown
            let _ = stream.shutdown().await;
        }

        self.socket_addr = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send_frame(&mut self, envelope: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let framed = Packet::wrap_tcp(envelope);
        trace!(
            "Sending {} bytes: {:02X?}",
            framed.len(),
            &framed[..framed.len().min(16)]
        );

        stream.write_all(&framed).await?;
        stream.flush().await?;

        Ok(())
    }

    async fn recv_frame(&mut self, recv_timeout: Duration) -> Result<BytesMut> {
        loop {
            if let Some(frame) = self.assembler.next_frame()? {
                trace!(
                    "Received frame of {} bytes ({} buffered)",
                    frame.len(),
                    self.assembler.buffered()
                );
                return Ok(frame);
            }

            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
            let mut chunk = [0u8; 4096];

            let n = timeout(recv_timeout, stream.read(&mut chunk))
                .await
                .map_err(|_| Error::ReadTimeout)?
                .map_err(Error::Io)?;

            if n == 0 {
                // Peer went away mid-frame
                if self.assembler.buffered() >= TCP_FRAME_HEADER {
                    let declared =
                        Packet::unwrap_tcp(&self.assembler.buf[..TCP_FRAME_HEADER]) as usize;
                    return Err(Error::TruncatedFrame {
                        declared,
                        received: self.assembler.buffered() - TCP_FRAME_HEADER,
                    });
                }
                return Err(Error::ConnectionClosed);
            }

            self.assembler.push(&chunk[..n]);
        }
    }

    fn is_tcp(&self) -> bool {
        true
    }

    fn remote_addr(&self) -> String {
        self.socket_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("TCP transport dropped while still connected");
        }
    }
}

//! UDP transport
//!
//! The original transport mode for these terminals: one datagram carries
//! exactly one envelope, no outer frame, no reassembly.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::{error::*, Transport};

/// Receive buffer: one reply header plus the largest inline chunk.
const RECV_BUFFER: usize = 8 + 16 * 1024;

/// UDP transport
pub struct UdpTransport {
    addr: String,
    port: u16,
    socket: Option<UdpSocket>,
    remote_addr: Option<SocketAddr>,
    connect_timeout: Duration,
}

impl UdpTransport {
    /// Create new UDP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            socket: None,
            remote_addr: None,
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
        if let Some(addr) = self.remote_addr {
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

        self.remote_addr = Some(*addr);
        Ok(*addr)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let remote = self.resolve_addr().await?;

        debug!("Connecting to {} via UDP...", remote);

        // Bind to any available local port
        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(Error::Io)?;

        // Connect to remote address (sets default send/recv target)
        socket.connect(remote).await.map_err(Error::Io)?;

        debug!("Connected to {} via UDP", remote);

        self.socket = Some(socket);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.socket.take().is_some() {
            debug!("Disconnecting from {}...", self.remote_addr());
        }

        self.remote_addr = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    async fn send_frame(&mut self, envelope: &[u8]) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;

        trace!(
            "Sending {} bytes via UDP: {:02X?}",
            envelope.len(),
            &envelope[..envelope.len().min(32)]
        );

        socket.send(envelope).await.map_err(Error::Io)?;

        Ok(())
    }

    async fn recv_frame(&mut self, recv_timeout: Duration) -> Result<BytesMut> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;

        let mut buf = BytesMut::zeroed(RECV_BUFFER);

        let n = timeout(recv_timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)?
            .map_err(|e| {
                warn!("Read error: {}", e);
                Error::Io(e)
            })?;

        if n == 0 {
            warn!("Received 0 bytes");
            return Err(Error::ConnectionClosed);
        }

        buf.truncate(n);

        trace!("Received {} bytes via UDP: {:02X?}", n, &buf[..n.min(32)]);

        Ok(buf)
    }

    fn is_tcp(&self) -> bool {
        false
    }

    fn remote_addr(&self) -> String {
        self.remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_transport_create() {
        let transport = UdpTransport::new("192.168.1.201", 4370);
        assert!(!transport.is_connected());
        assert!(!transport.is_tcp());
    }

    #[tokio::test]
    async fn test_udp_transport_invalid_address() {
        let mut transport = UdpTransport::new("invalid..address", 4370)
            .with_connect_timeout(Duration::from_millis(100));

        let result = transport.connect().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_udp_loopback_roundtrip() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let echo = tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(&buf[..n], peer).await.unwrap();
        });

        let mut transport = UdpTransport::new("127.0.0.1", port);
        transport.connect().await.unwrap();
        transport.send_frame(&[1, 2, 3, 4, 5, 6, 7, 8]).await.unwrap();

        let frame = transport.recv_frame(Duration::from_secs(5)).await.unwrap();
        assert_eq!(frame.as_ref(), &[1, 2, 3, 4, 5, 6, 7, 8]);

        transport.disconnect().await.unwrap();
        echo.await.unwrap();
    }

    #[tokio::test]
    async fn test_udp_recv_timeout() {
        let sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = sink.local_addr().unwrap().port();

        let mut transport = UdpTransport::new("127.0.0.1", port);
        transport.connect().await.unwrap();

        let err = transport
            .recv_frame(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}

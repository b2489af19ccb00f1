//! Scripted in-memory transport for exercising the device layer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};

use bioterm_core::Command;
use bioterm_transport::{Error as TransportError, Result as TransportResult, Transport};

use crate::Device;

#[derive(Debug)]
enum ScriptedReply {
    Frame(Vec<u8>),
    Timeout,
}

#[derive(Debug)]
struct Shared {
    sent: Vec<Vec<u8>>,
    replies: VecDeque<ScriptedReply>,
    connected: bool,
}

/// Transport that records every sent envelope and plays back a scripted
/// queue of reply envelopes. An empty queue reads as a timeout, which is
/// how idle live-capture waits are simulated.
#[derive(Debug, Clone)]
pub(crate) struct MockTransport {
    shared: Arc<Mutex<Shared>>,
    tcp: bool,
}

impl MockTransport {
    pub fn new(tcp: bool) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                sent: Vec::new(),
                replies: VecDeque::new(),
                connected: false,
            })),
            tcp,
        }
    }

    pub fn push_reply(&mut self, envelope: Vec<u8>) {
        self.shared
            .lock()
            .unwrap()
            .replies
            .push_back(ScriptedReply::Frame(envelope));
    }

    /// Script one read that times out instead of delivering a frame.
    pub fn push_timeout(&mut self) {
        self.shared
            .lock()
            .unwrap()
            .replies
            .push_back(ScriptedReply::Timeout);
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.lock().unwrap().sent.clone()
    }

    /// Command codes of every sent envelope, in order.
    pub fn sent_commands(&self) -> Vec<u16> {
        self.sent()
            .iter()
            .map(|e| u16::from_le_bytes([e[0], e[1]]))
            .collect()
    }

}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> TransportResult<()> {
        self.shared.lock().unwrap().connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> TransportResult<()> {
        self.shared.lock().unwrap().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.lock().unwrap().connected
    }

    async fn send_frame(&mut self, envelope: &[u8]) -> TransportResult<()> {
        self.shared.lock().unwrap().sent.push(envelope.to_vec());
        Ok(())
    }

    async fn recv_frame(&mut self, _timeout: Duration) -> TransportResult<BytesMut> {
        match self.shared.lock().unwrap().replies.pop_front() {
            Some(ScriptedReply::Frame(envelope)) => Ok(BytesMut::from(&envelope[..])),
            Some(ScriptedReply::Timeout) | None => Err(TransportError::ReadTimeout),
        }
    }

    fn is_tcp(&self) -> bool {
        self.tcp
    }

    fn remote_addr(&self) -> String {
        "mock:0".to_string()
    }
}

/// Mock session id used by [`connected_device`].
pub(crate) const MOCK_SESSION: u16 = 0xCDBF;

/// Build a reply envelope. The checksum field is zeroed since replies are
/// classified by code alone.
pub(crate) fn reply_frame(code: Command, session_id: u16, reply_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(8 + payload.len());
    buf.put_u16_le(code.into());
    buf.put_u16_le(0);
    buf.put_u16_le(session_id);
    buf.put_u16_le(reply_id);
    buf.put_slice(payload);
    buf.to_vec()
}

/// Device with an already-open session over the given mock, skipping the
/// connect handshake.
pub(crate) fn connected_device(mock: MockTransport) -> Device {
    let mut device = Device::with_transport(Box::new(mock));
    device.session.open(MOCK_SESSION).unwrap();
    device
}

//! Protocol packet structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::Command,
    constants::{TCP_FRAME_HEADER, TCP_MAGIC_1, TCP_MAGIC_2},
    error::{Error, Result},
};

/// Successor of a reply id.
///
/// The counter wraps modulo 0xFFFF, not 0x10000: 65534 + 1 emits 0. This is
/// how the firmware counts and the canonical CONNECT vector depends on it.
pub fn next_reply_id(reply_id: u16) -> u16 {
    if reply_id >= 0xFFFF - 1 {
        reply_id.wrapping_add(1).wrapping_sub(0xFFFF)
    } else {
        reply_id + 1
    }
}

/// One protocol envelope.
///
/// # Structure
///
/// ```text
/// ┌─────────────┬─────────────┬─────────────┬─────────────┬─────────────┐
/// │   Command   │  Checksum   │  SessionID  │  ReplyID    │   Payload   │
/// │   2 bytes   │   2 bytes   │   2 bytes   │   2 bytes   │   N bytes   │
/// │ (LE u16)    │  (LE u16)   │  (LE u16)   │  (LE u16)   │   (bytes)   │
/// └─────────────┴─────────────┴─────────────┴─────────────┴─────────────┘
/// ```
///
/// All multi-byte values are little-endian.
///
/// A quirk inherited from the firmware's reference client: the checksum is
/// computed over the envelope with the *current* reply id, but the emitted
/// header carries its successor. `reply_id` on this struct is the current
/// (pre-increment) value; [`Packet::encode`] emits the successor and the
/// caller learns it via [`next_reply_id`].
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Command code
    pub command: Command,

    /// Session identifier (assigned by device on connect)
    pub session_id: u16,

    /// Reply counter base for this envelope
    pub reply_id: u16,

    /// Packet payload (command-specific data)
    pub payload: Bytes,
}

impl Packet {
    /// Packet header size in bytes
    pub const HEADER_SIZE: usize = 8;

    /// Create a new packet with empty payload
    pub fn new(command: Command, session_id: u16, reply_id: u16) -> Self {
        Self {
            command,
            session_id,
            reply_id,
            payload: Bytes::new(),
        }
    }

    /// Create a packet with payload
    pub fn with_payload(
        command: Command,
        session_id: u16,
        reply_id: u16,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            command,
            session_id,
            reply_id,
            payload: payload.into(),
        }
    }

    /// Checksum over this envelope with the checksum field zeroed.
    pub fn checksum(&self) -> u16 {
        checksum::calculate(
            self.command.into(),
            self.session_id,
            self.reply_id,
            &self.payload,
        )
    }

    /// Encode to wire bytes.
    ///
    /// The header carries the successor reply id (see the struct docs).
    pub fn encode(&self) -> BytesMut {
        let total_size = Self::HEADER_SIZE + self.payload.len();
        let mut buf = BytesMut::with_capacity(total_size);

        buf.put_u16_le(self.command.into());
        buf.put_u16_le(self.checksum());
        buf.put_u16_le(self.session_id);
        buf.put_u16_le(next_reply_id(self.reply_id));

        buf.put_slice(&self.payload);

        buf
    }

    /// Decode from wire bytes.
    ///
    /// Reply checksums are not re-verified: replies are classified by their
    /// command code alone, matching observed device behavior (and the fact
    /// that outgoing headers do not checksum their own reply id either).
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is shorter than 8 bytes or the
    /// command code is unknown.
    pub fn decode(mut buf: BytesMut) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: Self::HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let command_raw = buf.get_u16_le();
        let _checksum = buf.get_u16_le();
        let session_id = buf.get_u16_le();
        let reply_id = buf.get_u16_le();

        let command = Command::try_from(command_raw)?;
        let payload = buf.freeze();

        Ok(Self {
            command,
            session_id,
            reply_id,
            payload,
        })
    }

    /// Prepend the TCP outer frame: two magic words and a u32 length.
    pub fn wrap_tcp(envelope: &[u8]) -> BytesMut {
        let mut buf = BytesMut::with_capacity(TCP_FRAME_HEADER + envelope.len());
        buf.put_u16_le(TCP_MAGIC_1);
        buf.put_u16_le(TCP_MAGIC_2);
        buf.put_u32_le(envelope.len() as u32);
        buf.put_slice(envelope);
        buf
    }

    /// Read the declared length out of a TCP outer frame.
    ///
    /// Returns 0 when the buffer is too short or the magic words do not
    /// match, which callers treat as an invalid frame.
    pub fn unwrap_tcp(header: &[u8]) -> u32 {
        if header.len() < TCP_FRAME_HEADER {
            return 0;
        }
        let magic1 = u16::from_le_bytes([header[0], header[1]]);
        let magic2 = u16::from_le_bytes([header[2], header[3]]);
        if magic1 != TCP_MAGIC_1 || magic2 != TCP_MAGIC_2 {
            return 0;
        }
        u32::from_le_bytes([header[4], header[5], header[6], header[7]])
    }

    /// Check if this is a response packet (ACK)
    pub fn is_response(&self) -> bool {
        self.command.is_response()
    }

    /// Check if this is a success response
    pub fn is_success(&self) -> bool {
        self.command.is_success()
    }

    /// Get total packet size
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command", &self.command)
            .field("session_id", &format!("0x{:04X}", self.session_id))
            .field("reply_id", &format!("0x{:04X}", self.reply_id))
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}](session={}, reply={}, len={})",
            self.command,
            self.session_id,
            self.reply_id,
            self.payload.len()
        )
    }
}

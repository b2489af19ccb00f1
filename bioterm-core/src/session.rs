//! Session bookkeeping
//!
//! Tracks the device-assigned session id and the reply counter. The
//! protocol is strictly one-request-one-reply over a single socket, so the
//! session is a plain single-owner struct: concurrent use of one session is
//! outside the protocol's model and callers wanting parallelism open a
//! second connection.

use crate::constants::INITIAL_REPLY_ID;
use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected
    Disconnected,

    /// Session established (and authenticated, when required)
    Connected,
}

/// Session id / reply counter pair for one connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session id assigned by device (0 when not connected)
    session_id: u16,

    /// Base value for the next outgoing envelope's reply counter
    reply_id: u16,

    state: SessionState,
}

impl Session {
    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            session_id: 0,
            reply_id: INITIAL_REPLY_ID,
            state: SessionState::Disconnected,
        }
    }

    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    pub fn reply_id(&self) -> u16 {
        self.reply_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Fail unless the session is established.
    ///
    /// Issuing anything but CONNECT/AUTH on a closed session is a
    /// programming error, reported rather than retried.
    pub fn require_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::SessionNotInitialized)
        }
    }

    /// Re-seed ids for a fresh CONNECT exchange.
    pub fn reset_for_connect(&mut self) {
        self.session_id = 0;
        self.reply_id = INITIAL_REPLY_ID;
    }

    /// Adopt the session id the device assigned during the handshake.
    pub fn adopt_session_id(&mut self, session_id: u16) {
        self.session_id = session_id;
    }

    /// Mark the session established.
    pub fn open(&mut self, session_id: u16) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "cannot open from state {:?}",
                self.state
            )));
        }
        self.session_id = session_id;
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Adopt the reply id echoed in a device reply.
    ///
    /// The device's echoed counter - not a client-side increment - is the
    /// base of the next outgoing envelope.
    pub fn sync_reply(&mut self, reply_id: u16) {
        self.reply_id = reply_id;
    }

    /// Tear the session down.
    pub fn close(&mut self) {
        self.session_id = 0;
        self.reply_id = INITIAL_REPLY_ID;
        self.state = SessionState::Disconnected;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new() {
        let session = Session::new();
        assert_eq!(session.session_id(), 0);
        assert_eq!(session.reply_id(), 0xFFFE);
        assert!(!session.is_connected());
        assert!(session.require_connected().is_err());
    }

    #[test]
    fn test_session_open_close() {
        let mut session = Session::new();
        session.open(0x45CF).unwrap();
        assert_eq!(session.session_id(), 0x45CF);
        assert!(session.require_connected().is_ok());

        session.close();
        assert_eq!(session.session_id(), 0);
        assert_eq!(session.reply_id(), 0xFFFE);
        assert!(!session.is_connected());
    }

    #[test]
    fn test_session_cannot_open_twice() {
        let mut session = Session::new();
        session.open(100).unwrap();
        assert!(matches!(
            session.open(200),
            Err(Error::InvalidSessionState(_))
        ));
    }

    #[test]
    fn test_sync_reply_adopts_device_counter() {
        let mut session = Session::new();
        session.open(100).unwrap();
        session.sync_reply(7);
        assert_eq!(session.reply_id(), 7);
    }
}

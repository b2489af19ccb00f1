//! Protocol constants

/// TCP outer-frame magic words. On the wire: `50 50 82 7d`.
pub const TCP_MAGIC_1: u16 = 0x5050;
pub const TCP_MAGIC_2: u16 = 0x7D82;

/// TCP outer-frame size (two magic words + u32 length)
pub const TCP_FRAME_HEADER: usize = 8;

/// Reply counter seed: the first envelope checksums over this value and
/// emits its successor, which wraps to 0.
pub const INITIAL_REPLY_ID: u16 = 0xFFFF - 1;

/// Reply id used when acknowledging unsolicited event frames.
pub const EVENT_REPLY_ID: u16 = 0xFFFF;

/// Default command timeout (seconds)
pub const DEFAULT_TIMEOUT: u64 = 10;

/// Receive timeout while a live-capture loop is idle (seconds)
pub const LIVE_CAPTURE_TIMEOUT: u64 = 10;

/// Per-chunk retry budget for buffered reads
pub const CHUNK_RETRIES: usize = 3;

/// Enrollment frame budget before the exchange is declared unresolved
pub const ENROLL_ATTEMPTS: usize = 3;

/// Application-level chunk ceiling for buffered reads over TCP
pub const MAX_CHUNK_TCP: u32 = 0xFFC0;

/// Application-level chunk ceiling for buffered reads over UDP
pub const MAX_CHUNK_UDP: u32 = 16 * 1024;

/// Upload chunk size for the prepare-data write path
pub const UPLOAD_CHUNK: usize = 1024;

bitflags::bitflags! {
    /// Real-time event classes for event registration.
    ///
    /// The registration payload is the union of the classes the caller
    /// wants pushed; an empty set de-registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventFlags: u32 {
        /// Attendance log event
        const ATTLOG = 1;
        /// Fingerprint pressed
        const FINGER = 1 << 1;
        /// User enrolled
        const ENROLLUSER = 1 << 2;
        /// Fingerprint enrolled
        const ENROLLFINGER = 1 << 3;
        /// Button pressed
        const BUTTON = 1 << 4;
        /// Door unlocked
        const UNLOCK = 1 << 5;
        /// Verification event
        const VERIFY = 1 << 7;
        /// Fingerprint minutiae captured
        const FPFTR = 1 << 8;
        /// Alarm signal
        const ALARM = 1 << 9;
    }
}

/// Data kind selectors for buffered reads
pub mod data_kinds {
    /// Attendance log
    pub const FCT_ATTLOG: i32 = 1;

    /// Fingerprint template
    pub const FCT_FINGERTMP: i32 = 2;

    /// Operation log
    pub const FCT_OPLOG: i32 = 4;

    /// User record
    pub const FCT_USER: i32 = 5;

    /// Work code
    pub const FCT_WORKCODE: i32 = 8;
}

/// Enrollment result codes embedded in event frames
pub mod enroll_codes {
    /// Step accepted / exchange complete
    pub const OK: u16 = 0;

    /// Finger already enrolled for another user
    pub const DUPLICATE: u16 = 4;

    /// Device-side timeout or cancelled exchange
    pub const TIMEOUT: u16 = 6;

    /// Synthesized when a frame is too short to carry a code
    pub const NO_CODE: u16 = 20;
}

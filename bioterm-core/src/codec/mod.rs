//! Binary record codecs
//!
//! Pure functions over byte slices, no I/O. All bulk decodes are
//! length-driven: the device declares a total byte count and the per-record
//! stride is derived from the cached record count (users, attendance) or an
//! embedded per-record size field (fingerprint templates). The declared
//! counts are trusted as ground truth; a payload that cannot hold them is a
//! data-integrity error, while a zero or sub-record total is simply an
//! empty collection.

pub mod attendance;
pub mod events;
pub mod options;
pub mod sizes;
pub mod template;
pub mod users;

pub use attendance::decode_attendance;
pub use events::{decode_live_events, LiveRecord};
pub use options::parse_option_value;
pub use sizes::decode_sizes;
pub use template::{decode_fingerprints, encode_finger, encode_template_upload};
pub use users::{decode_users, encode_user};

/// Decode a fixed-width string field: cut at the first NUL, lossy UTF-8.
pub fn decode_str(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Write a string into a fixed-width field, truncated and NUL-padded.
pub(crate) fn put_padded(buf: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let take = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..take]);
    buf.resize(buf.len() + (width - take), 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_str_stops_at_nul() {
        assert_eq!(decode_str(b"abc\x00def"), "abc");
        assert_eq!(decode_str(b"\x00xyz"), "");
        assert_eq!(decode_str(b"full"), "full");
    }

    #[test]
    fn test_put_padded_truncates_and_pads() {
        let mut buf = Vec::new();
        put_padded(&mut buf, "hi", 4);
        assert_eq!(buf, b"hi\x00\x00");

        let mut buf = Vec::new();
        put_padded(&mut buf, "overflowing", 4);
        assert_eq!(buf, b"over");
    }
}

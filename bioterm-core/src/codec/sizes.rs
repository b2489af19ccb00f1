//! Free-sizes response codec.

use byteorder::{ByteOrder, LittleEndian};

use bioterm_types::DeviceSizes;

use crate::error::{Error, Result};

/// Decode the GET_FREE_SIZES payload.
///
/// The payload is a block of LE i32 slots; the meaningful counts sit at
/// fixed indices with reserved slots in between. An optional trailing
/// 12-byte block carries face counts on hybrid hardware.
pub fn decode_sizes(payload: &[u8]) -> Result<DeviceSizes> {
    if payload.len() < 80 {
        return Err(Error::DataIntegrity {
            what: "free sizes",
            detail: format!("payload {} bytes, need 80", payload.len()),
        });
    }

    let slot = |i: usize| LittleEndian::read_i32(&payload[i * 4..i * 4 + 4]) as u32;

    let mut sizes = DeviceSizes {
        users: slot(4),
        fingers: slot(6),
        records: slot(8),
        cards: slot(12),
        fingers_cap: slot(14),
        users_cap: slot(15),
        records_cap: slot(16),
        fingers_available: slot(17),
        users_available: slot(18),
        records_available: slot(19),
        faces: None,
        faces_cap: None,
    };

    if payload.len() >= 92 {
        sizes.faces = Some(slot(20));
        sizes.faces_cap = Some(slot(22));
    }

    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload(slots: &[(usize, i32)], len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        for &(i, v) in slots {
            LittleEndian::write_i32(&mut buf[i * 4..i * 4 + 4], v);
        }
        buf
    }

    #[test]
    fn test_decode_sizes_fingerprint_only() {
        let buf = payload(&[(4, 12), (6, 20), (8, 3000), (15, 1000), (16, 100_000)], 80);
        let sizes = decode_sizes(&buf).unwrap();
        assert_eq!(sizes.users, 12);
        assert_eq!(sizes.fingers, 20);
        assert_eq!(sizes.records, 3000);
        assert_eq!(sizes.users_cap, 1000);
        assert_eq!(sizes.records_cap, 100_000);
        assert_eq!(sizes.faces, None);
    }

    #[test]
    fn test_decode_sizes_with_face_block() {
        let buf = payload(&[(4, 5), (20, 2), (22, 500)], 92);
        let sizes = decode_sizes(&buf).unwrap();
        assert_eq!(sizes.faces, Some(2));
        assert_eq!(sizes.faces_cap, Some(500));
    }

    #[test]
    fn test_decode_sizes_short_payload() {
        assert!(matches!(
            decode_sizes(&[0; 40]),
            Err(Error::DataIntegrity { .. })
        ));
    }
}

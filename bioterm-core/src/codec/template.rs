//! Fingerprint template codec and the template-upload pack.

use bytes::{Buf, Bytes};

use bioterm_types::{DeviceGeneration, Finger, User};

use crate::codec::users::encode_user_tagged;
use crate::error::{Error, Result};

/// Decode a bulk fingerprint payload.
///
/// Layout: a u32 total byte count, then variable-length records of
/// `{u16 size, u16 uid, i8 fid, i8 valid, size-6 bytes template}` consumed
/// until the declared total is exhausted. Payloads too small for the total
/// field decode as an empty collection.
pub fn decode_fingerprints(data: &[u8]) -> Result<Vec<Finger>> {
    if data.len() < 4 {
        return Ok(Vec::new());
    }

    let mut r = data;
    let mut remaining = r.get_u32_le() as usize;
    if remaining > r.len() {
        return Err(Error::DataIntegrity {
            what: "fingerprint block",
            detail: format!("declared {remaining} bytes, payload holds {}", r.len()),
        });
    }

    let mut fingers = Vec::new();
    while remaining >= 6 {
        let size = r.get_u16_le() as usize;
        if size < 6 || size > remaining {
            return Err(Error::DataIntegrity {
                what: "fingerprint record",
                detail: format!("record size {size} with {remaining} bytes left"),
            });
        }
        let uid = r.get_u16_le();
        let fid = r.get_i8();
        let valid = r.get_i8();
        let template = r[..size - 6].to_vec();
        r.advance(size - 6);
        remaining -= size;

        fingers.push(Finger::new(uid, fid as u8, valid != 0, template));
    }

    Ok(fingers)
}

/// Encode one template record, the exact inverse of the bulk layout.
pub fn encode_finger(finger: &Finger) -> Bytes {
    let mut buf = Vec::with_capacity(6 + finger.size());
    buf.extend_from_slice(&((finger.size() + 6) as u16).to_le_bytes());
    buf.extend_from_slice(&finger.uid.to_le_bytes());
    buf.push(finger.fid);
    buf.push(finger.valid as u8);
    buf.extend_from_slice(&finger.template);
    buf.into()
}

/// Build the upload pack for the save-template path.
///
/// Layout: `u32 user_len | u32 table_len | u32 templates_len`, then a
/// type-tagged user record, a finger table of
/// `{u8 2, u16 uid, u8 0x10+fid, u32 offset}` entries, then the template
/// blobs, each prefixed with its own u16 length (blob + 2).
pub fn encode_template_upload(
    user: &User,
    fingers: &[Finger],
    generation: DeviceGeneration,
) -> Result<Bytes> {
    let user_record = encode_user_tagged(user, generation)?;

    let mut table = Vec::with_capacity(fingers.len() * 8);
    let mut blobs = Vec::new();
    let mut offset = 0u32;
    for finger in fingers {
        table.push(2);
        table.extend_from_slice(&user.uid.to_le_bytes());
        table.push(0x10 + finger.fid);
        table.extend_from_slice(&offset.to_le_bytes());

        let blob_len = finger.size() as u32 + 2;
        blobs.extend_from_slice(&(blob_len as u16).to_le_bytes());
        blobs.extend_from_slice(&finger.template);
        offset += blob_len;
    }

    let mut buf =
        Vec::with_capacity(12 + user_record.len() + table.len() + blobs.len());
    buf.extend_from_slice(&(user_record.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(table.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(blobs.len() as u32).to_le_bytes());
    buf.extend_from_slice(&user_record);
    buf.extend_from_slice(&table);
    buf.extend_from_slice(&blobs);

    Ok(buf.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fingerprint_block_roundtrip() {
        let fingers = vec![
            Finger::new(1, 6, true, vec![0xAA; 100]),
            Finger::new(2, 0, false, vec![0xBB; 512]),
        ];

        let mut block = Vec::new();
        let mut body = Vec::new();
        for f in &fingers {
            body.extend_from_slice(&encode_finger(f));
        }
        block.extend_from_slice(&(body.len() as u32).to_le_bytes());
        block.extend_from_slice(&body);

        let decoded = decode_fingerprints(&block).unwrap();
        assert_eq!(decoded, fingers);
    }

    #[test]
    fn test_fingerprint_block_declared_size_governs() {
        let finger = Finger::new(1, 0, true, vec![1, 2, 3, 4]);
        let record = encode_finger(&finger);

        // Declare only the first record, leave trailing garbage behind
        let mut block = Vec::new();
        block.extend_from_slice(&(record.len() as u32).to_le_bytes());
        block.extend_from_slice(&record);
        block.extend_from_slice(&[0xFF; 16]);

        let decoded = decode_fingerprints(&block).unwrap();
        assert_eq!(decoded, vec![finger]);
    }

    #[test]
    fn test_fingerprint_block_too_small_is_empty() {
        assert!(decode_fingerprints(&[]).unwrap().is_empty());
        assert!(decode_fingerprints(&[0, 0]).unwrap().is_empty());
        // Declared total of zero
        assert!(decode_fingerprints(&[0, 0, 0, 0]).unwrap().is_empty());
    }

    #[test]
    fn test_fingerprint_block_oversized_total() {
        // Declares more bytes than the payload carries
        let block = [0xFF, 0x00, 0x00, 0x00, 1, 2];
        assert!(matches!(
            decode_fingerprints(&block),
            Err(Error::DataIntegrity { .. })
        ));
    }

    #[test]
    fn test_fingerprint_record_undersized() {
        // Record size below its own 6-byte header
        let mut block = Vec::new();
        block.extend_from_slice(&6u32.to_le_bytes());
        block.extend_from_slice(&2u16.to_le_bytes());
        block.extend_from_slice(&[0; 4]);
        assert!(decode_fingerprints(&block).is_err());
    }

    #[test]
    fn test_template_upload_layout() {
        let user = User::new(7, "7", "G");
        let fingers = vec![
            Finger::new(7, 0, true, vec![0x11; 10]),
            Finger::new(7, 1, true, vec![0x22; 20]),
        ];
        let pack =
            encode_template_upload(&user, &fingers, DeviceGeneration::Extended).unwrap();

        let user_len = u32::from_le_bytes(pack[0..4].try_into().unwrap());
        let table_len = u32::from_le_bytes(pack[4..8].try_into().unwrap());
        let blobs_len = u32::from_le_bytes(pack[8..12].try_into().unwrap());
        assert_eq!(user_len, 73);
        assert_eq!(table_len, 16); // two 8-byte entries
        assert_eq!(blobs_len, 10 + 20 + 4); // blobs plus their u16 prefixes
        assert_eq!(pack.len() as u32, 12 + user_len + table_len + blobs_len);

        // Second table entry points past the first blob
        let entry2 = &pack[12 + 73 + 8..12 + 73 + 16];
        assert_eq!(entry2[0], 2);
        assert_eq!(entry2[3], 0x10 + 1);
        assert_eq!(
            u32::from_le_bytes(entry2[4..8].try_into().unwrap()),
            12 // first blob: 10 bytes + 2-byte prefix
        );
    }
}

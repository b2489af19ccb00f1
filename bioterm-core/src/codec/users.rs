//! User record codec: 28- and 72-byte layouts.

use bytes::{Buf, Bytes};

use bioterm_types::{DeviceGeneration, Privilege, User};

use crate::codec::{decode_str, put_padded};
use crate::error::{Error, Result};

/// Decode a bulk user payload.
///
/// `data` is the record area (the caller has already stripped the 4-byte
/// in-payload total). The stride is `data.len() / count` and selects the
/// layout; the resolved [`DeviceGeneration`] is returned so the connection
/// can pin it for later encodes.
///
/// A count of zero, or a payload too small for one record, decodes to an
/// empty list without touching the record area.
pub fn decode_users(data: &[u8], count: u32) -> Result<(Vec<User>, Option<DeviceGeneration>)> {
    if count == 0 {
        return Ok((Vec::new(), None));
    }

    let stride = data.len() / count as usize;
    if stride == 0 {
        return Ok((Vec::new(), None));
    }

    let generation = DeviceGeneration::from_user_stride(stride).ok_or(Error::UnknownStride {
        what: "user",
        stride,
    })?;

    let mut users = Vec::with_capacity(count as usize);
    for record in data.chunks_exact(stride).take(count as usize) {
        users.push(match generation {
            DeviceGeneration::Compact => decode_user_28(record),
            DeviceGeneration::Extended => decode_user_72(record),
        });
    }

    Ok((users, Some(generation)))
}

fn decode_user_28(mut r: &[u8]) -> User {
    let uid = r.get_u16_le();
    let privilege = Privilege::from_raw(r.get_u8());
    let password = decode_str(&r[..5]);
    r.advance(5);
    let name = decode_str(&r[..8]);
    r.advance(8);
    let card = r.get_u32_le() as u64;
    r.advance(1); // pad
    let group_id = r.get_u8().to_string();
    let _timezone = r.get_i16_le();
    let user_id = r.get_u32_le().to_string();

    User {
        uid,
        name: synthesize_name(name, &user_id),
        privilege,
        password,
        group_id,
        user_id,
        card,
    }
}

fn decode_user_72(mut r: &[u8]) -> User {
    let uid = r.get_u16_le();
    let privilege = Privilege::from_raw(r.get_u8());
    let password = decode_str(&r[..8]);
    r.advance(8);
    let name = decode_str(&r[..24]);
    r.advance(24);
    let card = r.get_u32_le() as u64;
    r.advance(1); // separator
    let group_id = decode_str(&r[..7]);
    r.advance(8); // group + pad
    let user_id = decode_str(&r[..24]);

    User {
        uid,
        name: synthesize_name(name, &user_id),
        privilege,
        password,
        group_id,
        user_id,
        card,
    }
}

/// A blank on-device name becomes `NN-<user_id>`.
fn synthesize_name(name: String, user_id: &str) -> String {
    if name.is_empty() {
        format!("NN-{user_id}")
    } else {
        name
    }
}

/// Encode one user for upload, in the target generation's layout.
///
/// # Errors
///
/// The compact layout stores `user_id` and `group_id` numerically; values
/// that do not parse are encoding errors. A card number above 32 bits does
/// not fit either layout.
pub fn encode_user(user: &User, generation: DeviceGeneration) -> Result<Bytes> {
    if user.card > u32::MAX as u64 {
        return Err(Error::FieldEncoding {
            field: "card",
            detail: format!("{} exceeds 32 bits", user.card),
        });
    }

    let mut buf = Vec::with_capacity(generation.user_record_len());
    buf.extend_from_slice(&user.uid.to_le_bytes());
    buf.push(user.privilege.to_raw());

    match generation {
        DeviceGeneration::Compact => {
            put_padded(&mut buf, &user.password, 5);
            put_padded(&mut buf, &user.name, 8);
            buf.extend_from_slice(&(user.card as u32).to_le_bytes());
            buf.push(0);
            buf.push(parse_numeric(&user.group_id, "group_id")? as u8);
            buf.extend_from_slice(&0u16.to_le_bytes()); // timezone
            let user_id = parse_numeric(&user.user_id, "user_id")?;
            buf.extend_from_slice(&user_id.to_le_bytes());
        }
        DeviceGeneration::Extended => {
            put_padded(&mut buf, &user.password, 8);
            put_padded(&mut buf, &user.name, 24);
            buf.extend_from_slice(&(user.card as u32).to_le_bytes());
            buf.push(0);
            put_padded(&mut buf, &user.group_id, 7);
            buf.push(0);
            put_padded(&mut buf, &user.user_id, 24);
        }
    }

    debug_assert_eq!(buf.len(), generation.user_record_len());
    Ok(buf.into())
}

/// Encode a user record for the template-upload pack, with the leading
/// record-type byte the save path expects.
pub fn encode_user_tagged(user: &User, generation: DeviceGeneration) -> Result<Bytes> {
    let record = encode_user(user, generation)?;
    let mut buf = Vec::with_capacity(1 + record.len());
    buf.push(2); // record type
    buf.extend_from_slice(&record);
    Ok(buf.into())
}

fn parse_numeric(s: &str, field: &'static str) -> Result<u32> {
    if s.is_empty() {
        return Ok(0);
    }
    s.parse().map_err(|_| Error::FieldEncoding {
        field,
        detail: format!("{s:?} is not numeric, required by the compact layout"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extended_record(uid: u16, user_id: &str, name: &str) -> Vec<u8> {
        let user = User::new(uid, user_id, name);
        encode_user(&user, DeviceGeneration::Extended)
            .unwrap()
            .to_vec()
    }

    fn compact_record(uid: u16, user_id: &str, name: &str) -> Vec<u8> {
        let user = User::new(uid, user_id, name);
        encode_user(&user, DeviceGeneration::Compact)
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_decode_users_72_stride_dispatch() {
        // 7 records at 72 bytes; record 3 has uid 4 and a blank name
        let mut data = Vec::new();
        for i in 0..7u16 {
            let user_id = format!("83{i}");
            let name = if i == 3 { "" } else { "user" };
            data.extend_from_slice(&extended_record(i + 1, &user_id, name));
        }
        assert_eq!(data.len(), 7 * 72);

        let (users, generation) = decode_users(&data, 7).unwrap();
        assert_eq!(generation, Some(DeviceGeneration::Extended));
        assert_eq!(users.len(), 7);
        assert_eq!(users[3].uid, 4);
        assert_eq!(users[3].user_id, "831");
        assert_eq!(users[3].name, "NN-831");
    }

    #[test]
    fn test_decode_users_28_stride_dispatch() {
        let mut data = Vec::new();
        for i in 0..7u16 {
            data.extend_from_slice(&compact_record(i + 1, &format!("83{i}"), ""));
        }
        assert_eq!(data.len(), 7 * 28);

        let (users, generation) = decode_users(&data, 7).unwrap();
        assert_eq!(generation, Some(DeviceGeneration::Compact));
        assert_eq!(users[3].uid, 4);
        assert_eq!(users[3].user_id, "831");
        assert_eq!(users[3].name, "NN-831");
    }

    #[test]
    fn test_decode_users_zero_count_ignores_leftover_bytes() {
        let (users, generation) = decode_users(&[0xAA; 64], 0).unwrap();
        assert!(users.is_empty());
        assert_eq!(generation, None);
    }

    #[test]
    fn test_decode_users_unknown_stride() {
        assert!(matches!(
            decode_users(&[0; 40], 1),
            Err(Error::UnknownStride {
                what: "user",
                stride: 40
            })
        ));
    }

    #[test]
    fn test_user_roundtrip_extended() {
        let user = User::new(9, "emp-42", "Rosa Mendez")
            .with_privilege(Privilege::ADMIN)
            .with_password("9182")
            .with_group("1")
            .with_card(1_234_567);
        let record = encode_user(&user, DeviceGeneration::Extended).unwrap();
        let (decoded, _) = decode_users(&record, 1).unwrap();
        assert_eq!(decoded[0], user);
    }

    #[test]
    fn test_user_roundtrip_compact() {
        let user = User::new(3, "831", "Kim")
            .with_password("12")
            .with_group("2")
            .with_card(88);
        let record = encode_user(&user, DeviceGeneration::Compact).unwrap();
        let (decoded, _) = decode_users(&record, 1).unwrap();
        assert_eq!(decoded[0], user);
    }

    #[test]
    fn test_encode_compact_rejects_text_user_id() {
        let user = User::new(3, "emp-42", "Kim");
        assert!(matches!(
            encode_user(&user, DeviceGeneration::Compact),
            Err(Error::FieldEncoding { field: "user_id", .. })
        ));
    }

    #[test]
    fn test_encode_rejects_wide_card() {
        let user = User::new(3, "3", "Kim").with_card(1 << 36);
        assert!(encode_user(&user, DeviceGeneration::Extended).is_err());
    }

    #[test]
    fn test_encode_user_tagged() {
        let user = User::new(1, "1", "A");
        let tagged = encode_user_tagged(&user, DeviceGeneration::Extended).unwrap();
        assert_eq!(tagged.len(), 73);
        assert_eq!(tagged[0], 2);
    }
}

//! Attendance record codec: 8-, 16- and 40-byte layouts.

use std::collections::HashMap;

use bytes::Buf;

use bioterm_types::{Attendance, User};

use crate::clock;
use crate::codec::decode_str;
use crate::error::{Error, Result};

/// Decode a bulk attendance payload.
///
/// `data` is the record area with the 4-byte in-payload total already
/// stripped; the stride is `data.len() / count`. Three layouts are known,
/// matching progressively richer firmware; the declared stride is
/// authoritative and no other variants are guessed at.
///
/// `users` is the user list read at the start of this operation, used for
/// best-effort uid/user_id cross-referencing. When no user matches, the raw
/// identifier is carried over.
pub fn decode_attendance(data: &[u8], count: u32, users: &[User]) -> Result<Vec<Attendance>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let stride = data.len() / count as usize;
    if stride == 0 {
        return Ok(Vec::new());
    }

    // One index per read, not a linear scan per record
    let by_uid: HashMap<u16, &User> = users.iter().map(|u| (u.uid, u)).collect();
    let by_user_id: HashMap<&str, &User> =
        users.iter().map(|u| (u.user_id.as_str(), u)).collect();

    let mut records = Vec::with_capacity(count as usize);
    for record in data.chunks_exact(stride).take(count as usize) {
        records.push(match stride {
            8 => decode_att_8(record, &by_uid)?,
            16 => decode_att_16(record, &by_user_id)?,
            40 => decode_att_40(record)?,
            _ => {
                return Err(Error::UnknownStride {
                    what: "attendance",
                    stride,
                })
            }
        });
    }

    Ok(records)
}

fn decode_att_8(mut r: &[u8], by_uid: &HashMap<u16, &User>) -> Result<Attendance> {
    let uid = r.get_u16_le();
    let status = r.get_u8();
    let timestamp = clock::decode_time(r.get_u32_le())?;
    let punch = r.get_u8();

    let user_id = by_uid
        .get(&uid)
        .map(|u| u.user_id.clone())
        .unwrap_or_else(|| uid.to_string());

    Ok(Attendance::new(uid, user_id, timestamp, status, punch))
}

fn decode_att_16(mut r: &[u8], by_user_id: &HashMap<&str, &User>) -> Result<Attendance> {
    let user_id = r.get_u32_le().to_string();
    let timestamp = clock::decode_time(r.get_u32_le())?;
    let status = r.get_u8();
    let punch = r.get_u8();
    r.advance(2); // reserved
    let _workcode = r.get_u32_le();

    let uid = by_user_id
        .get(user_id.as_str())
        .map(|u| u.uid)
        .unwrap_or_else(|| user_id.parse().unwrap_or_default());

    Ok(Attendance::new(uid, user_id, timestamp, status, punch))
}

fn decode_att_40(mut r: &[u8]) -> Result<Attendance> {
    let uid = r.get_u16_le();
    let user_id = decode_str(&r[..24]);
    r.advance(24);
    let status = r.get_u8();
    let timestamp = clock::decode_time(r.get_u32_le())?;
    let punch = r.get_u8();

    Ok(Attendance::new(uid, user_id, timestamp, status, punch))
}

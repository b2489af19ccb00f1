//! Real-time attendance event frame decoding.

use chrono::NaiveDateTime;

use crate::clock;
use crate::codec::decode_str;
use crate::error::Result;

/// One attendance event as carried by a REG_EVENT frame, before uid
/// resolution against the user snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRecord {
    pub user_id: String,
    pub status: u8,
    pub punch: u8,
    pub timestamp: NaiveDateTime,
}

/// Decode the payload of a REG_EVENT attendance frame.
///
/// Observed firmware emits several fixed layouts distinguished purely by
/// the remaining payload length: 10/12/14 bytes with a numeric identifier,
/// 32/36/37 bytes with a 24-byte text identifier, and 52-byte records that
/// may repeat within one frame. Anything else left over is trailing data we
/// do not understand and is skipped rather than guessed at.
pub fn decode_live_events(data: &[u8]) -> Result<Vec<LiveRecord>> {
    let mut records = Vec::new();
    let mut rest = data;

    while rest.len() >= 10 {
        let (user_id, status, punch, timehex, consumed): (String, u8, u8, [u8; 6], usize) =
            match rest.len() {
                10 => {
                    let id = u16::from_le_bytes([rest[0], rest[1]]);
                    (id.to_string(), rest[2], rest[3], six(&rest[4..10]), 10)
                }
                12 => {
                    let id = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
                    (id.to_string(), rest[4], rest[5], six(&rest[6..12]), 12)
                }
                14 => {
                    let id = u16::from_le_bytes([rest[0], rest[1]]);
                    (id.to_string(), rest[2], rest[3], six(&rest[4..10]), 14)
                }
                32 => (decode_str(&rest[..24]), rest[24], rest[25], six(&rest[26..32]), 32),
                36 => (decode_str(&rest[..24]), rest[24], rest[25], six(&rest[26..32]), 36),
                37 => (decode_str(&rest[..24]), rest[24], rest[25], six(&rest[26..32]), 37),
                n if n >= 52 => {
                    (decode_str(&rest[..24]), rest[24], rest[25], six(&rest[26..32]), 52)
                }
                _ => break,
            };

        records.push(LiveRecord {
            user_id,
            status,
            punch,
            timestamp: clock::decode_timehex(&timehex)?,
        });
        rest = &rest[consumed..];
    }

    Ok(records)
}

fn six(raw: &[u8]) -> [u8; 6] {
    [raw[0], raw[1], raw[2], raw[3], raw[4], raw[5]]
}

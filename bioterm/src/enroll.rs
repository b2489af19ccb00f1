//! Fingerprint enrollment
//!
//! Enrollment is driven by the device: after START_ENROLL the terminal
//! prompts for the finger, and progress comes back as event frames whose
//! first payload word is a result code. Two clean presses and a final
//! confirmation make a successful enrollment; duplicate and timeout
//! codes resolve it early. Frames without a readable code burn one of a
//! small attempt budget so a confused device cannot hang the call.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, warn};

use bioterm_core::constants::{enroll_codes, EventFlags, ENROLL_ATTEMPTS};
use bioterm_core::Command;
use bioterm_types::DeviceGeneration;

use crate::device::Device;
use crate::error::{Error, Result};

use std::time::Duration;

/// How long the device is given for each finger press.
const PRESS_TIMEOUT: Duration = Duration::from_secs(60);

/// Terminal result of one enrollment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    /// Template captured and stored. `size` and `position` echo the
    /// stored template's byte count and slot as reported by the device;
    /// older firmware leaves them zero.
    Enrolled { size: u16, position: u16 },

    /// The finger is already enrolled, on this or another user.
    Duplicate,

    /// The device gave up waiting for a press.
    Timeout,

    /// The device reported a result code this client does not map.
    Failed(u16),
}

impl EnrollOutcome {
    pub fn is_enrolled(self) -> bool {
        matches!(self, EnrollOutcome::Enrolled { .. })
    }
}

impl Device {
    /// Enroll one finger for one user, interactively.
    ///
    /// Blocks through the whole press-press-confirm dialog on the device.
    /// `user_id` may be omitted when the user already exists; it is then
    /// looked up from the user table by `uid`.
    pub async fn enroll_user(
        &mut self,
        uid: u16,
        fid: u8,
        user_id: Option<&str>,
    ) -> Result<EnrollOutcome> {
        let user_id = match user_id {
            Some(id) => id.to_string(),
            None => {
                let users = self.get_users().await?;
                users
                    .iter()
                    .find(|u| u.uid == uid)
                    .map(|u| u.user_id.clone())
                    .ok_or(Error::UserNotFound(uid))?
            }
        };

        self.cancel_capture().await?;
        self.reg_event(EventFlags::ENROLLFINGER).await?;
        let payload = start_enroll_payload(&user_id, fid, self.generation)?;
        self.execute(Command::StartEnroll, payload).await?;
        info!(uid, fid, user_id, "enrollment started");

        let mut presses = 0u8;
        let mut outcome = EnrollOutcome::Failed(enroll_codes::NO_CODE);
        for attempt in 1..=ENROLL_ATTEMPTS {
            let packet = match self.recv_packet_within(PRESS_TIMEOUT).await {
                Ok(packet) => packet,
                Err(e) if e.is_timeout() => {
                    outcome = EnrollOutcome::Timeout;
                    break;
                }
                Err(e) => return Err(e),
            };
            self.ack_event().await?;

            let code = if packet.payload.len() >= 2 {
                u16::from_le_bytes([packet.payload[0], packet.payload[1]])
            } else {
                enroll_codes::NO_CODE
            };
            debug!(attempt, code, "enrollment frame");

            match code {
                enroll_codes::OK => {
                    presses += 1;
                    if presses as usize >= ENROLL_ATTEMPTS {
                        // Final frame carries the stored size and slot
                        outcome = EnrollOutcome::Enrolled {
                            size: word(&packet.payload, 2),
                            position: word(&packet.payload, 4),
                        };
                        break;
                    }
                }
                enroll_codes::DUPLICATE => {
                    outcome = EnrollOutcome::Duplicate;
                    break;
                }
                enroll_codes::TIMEOUT => {
                    outcome = EnrollOutcome::Timeout;
                    break;
                }
                enroll_codes::NO_CODE => {
                    warn!(attempt, "enrollment frame without a result code");
                }
                other => {
                    outcome = EnrollOutcome::Failed(other);
                    break;
                }
            }
        }

        self.reg_event(EventFlags::empty()).await?;
        self.cancel_capture().await?;
        self.start_verify().await?;
        info!(uid, fid, ?outcome, "enrollment finished");
        Ok(outcome)
    }
}

fn word(payload: &[u8], at: usize) -> u16 {
    match payload.get(at..at + 2) {
        Some(b) => u16::from_le_bytes([b[0], b[1]]),
        None => 0,
    }
}

/// START_ENROLL argument block: text id on the wide layout, numeric id
/// on the narrow one.
fn start_enroll_payload(user_id: &str, fid: u8, generation: DeviceGeneration) -> Result<Bytes> {
    let mut payload = BytesMut::with_capacity(26);
    match generation {
        DeviceGeneration::Extended => {
            let bytes = user_id.as_bytes();
            let take = bytes.len().min(24);
            payload.put_slice(&bytes[..take]);
            payload.put_bytes(0, 24 - take);
            payload.put_i8(fid as i8);
            payload.put_i8(1); // flag: create if missing
        }
        DeviceGeneration::Compact => {
            let numeric: u32 =
                user_id
                    .parse()
                    .map_err(|_| bioterm_core::Error::FieldEncoding {
                        field: "user_id",
                        detail: format!("{user_id:?} is not numeric, required by this device"),
                    })?;
            payload.put_u32_le(numeric);
            payload.put_i8(fid as i8);
        }
    }
    Ok(payload.freeze())
}

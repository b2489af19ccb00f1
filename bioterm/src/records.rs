//! User, attendance and fingerprint-template operations.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, warn};

use bioterm_core::constants::{data_kinds, CHUNK_RETRIES};
use bioterm_core::{codec, Command};
use bioterm_types::{Attendance, Finger, Privilege, User};

use crate::device::Device;
use crate::error::{Error, Result};

impl Device {
    /// Next free internal uid, tracked from the last user read.
    pub fn next_uid(&self) -> u16 {
        self.next_uid
    }

    /// Next free external user id, tracked from the last user read.
    pub fn next_user_id(&self) -> String {
        self.next_user_id.to_string()
    }

    fn note_user_ids(&mut self, users: &[User]) {
        let mut next_uid = 1u16;
        let mut next_user_id = 1u32;
        for user in users {
            if user.uid >= next_uid {
                next_uid = user.uid.saturating_add(1);
            }
            if let Ok(n) = user.user_id.parse::<u32>() {
                if n >= next_user_id {
                    next_user_id = n.saturating_add(1);
                }
            }
        }
        self.next_uid = next_uid;
        self.next_user_id = next_user_id.max(next_uid as u32);
    }

    // ---- users ------------------------------------------------------------

    /// Read the full user table.
    ///
    /// Also refreshes the capacity snapshot (the record count is what
    /// determines the per-record stride) and pins the record layout for
    /// subsequent writes.
    pub async fn get_users(&mut self) -> Result<Vec<User>> {
        let sizes = self.read_sizes().await?;
        let raw = self
            .read_with_buffer(Command::UserTempRrq, data_kinds::FCT_USER, 0)
            .await?;
        if raw.len() <= 4 {
            return Ok(Vec::new());
        }

        let declared = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        let end = raw.len().min(4 + declared);
        let (users, generation) = codec::decode_users(&raw[4..end], sizes.users)?;

        if let Some(generation) = generation {
            if generation != self.generation {
                debug!(?generation, "record layout pinned from user stride");
            }
            self.generation = generation;
        }
        self.note_user_ids(&users);
        info!(count = users.len(), "users read");
        Ok(users)
    }

    /// Create or overwrite one user record.
    ///
    /// The device keys the write on `uid`; an existing record with that
    /// uid is replaced. Use [`Device::next_uid`] and
    /// [`Device::next_user_id`] after a user read to allocate fresh ids.
    pub async fn set_user(&mut self, user: &User) -> Result<()> {
        let record = codec::encode_user(user, self.generation)?;
        self.execute(Command::UserWrq, record).await?;
        self.refresh_data().await?;

        if user.uid >= self.next_uid {
            self.next_uid = user.uid.saturating_add(1);
        }
        if let Ok(n) = user.user_id.parse::<u32>() {
            if n >= self.next_user_id {
                self.next_user_id = n.saturating_add(1);
            }
        }
        Ok(())
    }

    /// Create a user with freshly-allocated ids.
    ///
    /// Re-reads the user table so the allocation hints are current, then
    /// writes a record under the next free uid and numeric user id.
    pub async fn create_user(
        &mut self,
        name: &str,
        privilege: Privilege,
        password: &str,
    ) -> Result<User> {
        self.get_users().await?;
        let user = User::new(self.next_uid, self.next_user_id.to_string(), name)
            .with_privilege(privilege)
            .with_password(password);
        self.set_user(&user).await?;
        Ok(user)
    }

    /// Delete the user record with the given internal uid, along with its
    /// stored templates.
    pub async fn delete_user(&mut self, uid: u16) -> Result<()> {
        let mut payload = BytesMut::with_capacity(2);
        payload.put_u16_le(uid);
        self.execute(Command::DeleteUser, payload.freeze()).await?;
        self.refresh_data().await
    }

    /// Delete a user addressed by external user id.
    ///
    /// Returns `false` when no such user exists on the device.
    pub async fn delete_user_by_user_id(&mut self, user_id: &str) -> Result<bool> {
        let users = self.get_users().await?;
        match users.iter().find(|u| u.user_id == user_id) {
            Some(user) => {
                let uid = user.uid;
                self.delete_user(uid).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ---- attendance -------------------------------------------------------

    /// Read the attendance log.
    ///
    /// The user table is read first so records can carry both identifier
    /// forms regardless of which one their layout stores.
    pub async fn get_attendance(&mut self) -> Result<Vec<Attendance>> {
        let users = self.get_users().await?;
        let records = self.sizes.as_ref().map(|s| s.records).unwrap_or(0);
        if records == 0 {
            return Ok(Vec::new());
        }

        let raw = self
            .read_with_buffer(Command::AttLogRrq, data_kinds::FCT_ATTLOG, 0)
            .await?;
        if raw.len() <= 4 {
            return Ok(Vec::new());
        }

        let declared = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        let end = raw.len().min(4 + declared);
        let log = codec::decode_attendance(&raw[4..end], records, &users)?;
        info!(count = log.len(), "attendance read");
        Ok(log)
    }

    /// Erase the attendance log.
    pub async fn clear_attendance(&mut self) -> Result<()> {
        self.execute(Command::ClearAttLog, Bytes::new()).await?;
        self.refresh_data().await
    }

    /// Erase all users, templates and logs. There is no undo.
    pub async fn clear_data(&mut self) -> Result<()> {
        self.execute(Command::ClearData, Bytes::new()).await?;
        self.next_uid = 1;
        self.next_user_id = 1;
        self.refresh_data().await
    }

    // ---- fingerprint templates --------------------------------------------

    /// Read every stored fingerprint template.
    pub async fn get_templates(&mut self) -> Result<Vec<Finger>> {
        let sizes = self.read_sizes().await?;
        if sizes.fingers == 0 {
            return Ok(Vec::new());
        }
        let raw = self
            .read_with_buffer(Command::DbRrq, data_kinds::FCT_FINGERTMP, 0)
            .await?;
        let fingers = codec::decode_fingerprints(&raw)?;
        info!(count = fingers.len(), "templates read");
        Ok(fingers)
    }

    /// Read one user's template for one finger.
    ///
    /// The reply blob carries a stray trailing byte and, on most
    /// firmware, six bytes of NUL padding; both are stripped.
    pub async fn get_user_template(&mut self, uid: u16, fid: u8) -> Result<Finger> {
        let mut payload = BytesMut::with_capacity(3);
        payload.put_i16_le(uid as i16);
        payload.put_i8(fid as i8);
        let payload = payload.freeze();

        for attempt in 1..=CHUNK_RETRIES {
            match self
                .read_command_data(Command::UserTempRrq, payload.clone())
                .await
            {
                Ok(data) if !data.is_empty() => {
                    let mut blob = &data[..data.len() - 1];
                    if blob.len() >= 6 && blob[blob.len() - 6..].iter().all(|&b| b == 0) {
                        blob = &blob[..blob.len() - 6];
                    }
                    return Ok(Finger::new(uid, fid, true, blob.to_vec()));
                }
                Ok(_) => {
                    warn!(uid, fid, attempt, "empty template reply, retrying");
                }
                Err(e) if attempt < CHUNK_RETRIES => {
                    warn!(uid, fid, attempt, error = %e, "template read failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Transfer {
            command: Command::UserTempRrq,
            detail: format!("no template for uid {uid} finger {fid}"),
        })
    }

    /// Delete one user's template for one finger.
    pub async fn delete_user_template(&mut self, uid: u16, fid: u8) -> Result<()> {
        let mut payload = BytesMut::with_capacity(3);
        payload.put_i16_le(uid as i16);
        payload.put_i8(fid as i8);
        self.execute(Command::DeleteUserTemp, payload.freeze())
            .await?;
        self.refresh_data().await
    }

    /// Write a user record together with its fingerprint templates in one
    /// atomic upload.
    pub async fn save_user_template(&mut self, user: &User, fingers: &[Finger]) -> Result<()> {
        let pack = codec::encode_template_upload(user, fingers, self.generation)?;
        self.send_with_buffer(&pack).await?;

        // Commit trailer: fixed arguments inherited from the vendor SDK
        let mut trailer = BytesMut::with_capacity(8);
        trailer.put_u32_le(12);
        trailer.put_u16_le(0);
        trailer.put_u16_le(8);
        self.execute(Command::SaveUserTemps, trailer.freeze()).await?;
        self.refresh_data().await
    }
}

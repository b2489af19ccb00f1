//! Bulk data transfer
//!
//! Large data sets (user tables, attendance logs, template databases)
//! move through a device-side staging buffer: the host announces what it
//! wants with PREPARE_BUFFER, the device answers with the total byte
//! count, and the host pulls bounded chunks with READ_BUFFER until the
//! buffer is drained, then releases it with FREE_DATA. Small sets skip
//! the dance and arrive inline in a single DATA reply.
//!
//! Each chunk may itself arrive either as one DATA envelope or as a
//! PREPARE_DATA announcement followed by a stream of DATA envelopes and
//! a closing ACK_OK. Uploads run the same protocol in reverse.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use bioterm_core::constants::{CHUNK_RETRIES, MAX_CHUNK_TCP, MAX_CHUNK_UDP, UPLOAD_CHUNK};
use bioterm_core::Command;

use crate::device::{Device, Reply};
use crate::error::{Error, Result};

impl Device {
    /// Pull one complete data set through the staging buffer.
    ///
    /// `fct` selects the table (users, templates, logs); `ext` is a
    /// table-specific extension argument, zero for full dumps.
    pub(crate) async fn read_with_buffer(
        &mut self,
        command: Command,
        fct: i32,
        ext: i32,
    ) -> Result<Vec<u8>> {
        let mut payload = BytesMut::with_capacity(11);
        payload.put_u8(1);
        payload.put_i16_le(u16::from(command) as i16);
        payload.put_i32_le(fct);
        payload.put_i32_le(ext);

        let reply = self.execute(Command::PrepareBuffer, payload.freeze()).await?;
        if reply.code == Command::Data {
            // Small set, no staging buffer involved
            return Ok(reply.payload.to_vec());
        }
        if reply.payload.len() < 5 {
            return Err(Error::Transfer {
                command,
                detail: "buffer announcement too short".into(),
            });
        }
        let total = u32::from_le_bytes([
            reply.payload[1],
            reply.payload[2],
            reply.payload[3],
            reply.payload[4],
        ]) as usize;
        debug!(%command, total, "staged read");

        let max_chunk = if self.transport.is_tcp() {
            MAX_CHUNK_TCP
        } else {
            MAX_CHUNK_UDP
        } as usize;

        let mut data = Vec::with_capacity(total);
        let mut start = 0usize;
        while start < total {
            let want = (total - start).min(max_chunk);
            let chunk = self.read_chunk(start as u32, want as u32).await?;
            if chunk.is_empty() {
                return Err(Error::Transfer {
                    command,
                    detail: format!("empty chunk at offset {start}"),
                });
            }
            data.extend_from_slice(&chunk);
            start += chunk.len();
        }
        self.free_data().await?;

        if data.len() != total {
            warn!(
                declared = total,
                received = data.len(),
                "staged read length mismatch"
            );
        }
        Ok(data)
    }

    /// Pull one bounded chunk out of the staging buffer, retrying a few
    /// times before giving up on the transfer.
    async fn read_chunk(&mut self, start: u32, size: u32) -> Result<Vec<u8>> {
        for attempt in 1..=CHUNK_RETRIES {
            let mut payload = BytesMut::with_capacity(8);
            payload.put_i32_le(start as i32);
            payload.put_i32_le(size as i32);

            let reply = match self.execute(Command::ReadBuffer, payload.freeze()).await {
                Ok(reply) => reply,
                Err(e) if attempt < CHUNK_RETRIES => {
                    warn!(start, size, attempt, error = %e, "chunk read failed, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match reply.code {
                Command::Data | Command::AckData => return Ok(reply.payload.to_vec()),
                Command::PrepareData => match self.recv_prepared(&reply).await {
                    Ok(data) => return Ok(data),
                    Err(e) if attempt < CHUNK_RETRIES => {
                        warn!(start, size, attempt, error = %e, "chunk stream failed, retrying");
                        continue;
                    }
                    Err(e) => return Err(e),
                },
                other => {
                    warn!(start, size, attempt, code = %other, "unexpected chunk reply");
                }
            }
        }
        Err(Error::Transfer {
            command: Command::ReadBuffer,
            detail: format!("chunk at offset {start} failed after {CHUNK_RETRIES} attempts"),
        })
    }

    /// Collect a PREPARE_DATA stream: DATA envelopes until the announced
    /// byte count is reached, then the closing ACK_OK.
    pub(crate) async fn recv_prepared(&mut self, announcement: &Reply) -> Result<Vec<u8>> {
        if announcement.payload.len() < 4 {
            return Err(Error::Transfer {
                command: Command::PrepareData,
                detail: "size announcement too short".into(),
            });
        }
        let declared = u32::from_le_bytes([
            announcement.payload[0],
            announcement.payload[1],
            announcement.payload[2],
            announcement.payload[3],
        ]) as usize;

        let mut data = Vec::with_capacity(declared);
        if announcement.payload.len() > 4 {
            data.extend_from_slice(&announcement.payload[4..]);
        }
        while data.len() < declared {
            let packet = self.recv_packet().await?;
            match packet.command {
                Command::Data => data.extend_from_slice(&packet.payload),
                Command::AckOk => {
                    return Err(Error::Transfer {
                        command: Command::Data,
                        detail: format!(
                            "stream closed after {} of {} bytes",
                            data.len(),
                            declared
                        ),
                    });
                }
                other => {
                    return Err(Error::Transfer {
                        command: Command::Data,
                        detail: format!("unexpected {other} inside data stream"),
                    });
                }
            }
        }
        let closing = self.recv_packet().await?;
        if closing.command != Command::AckOk {
            warn!(code = %closing.command, "data stream closed without ACK_OK");
        }
        Ok(data)
    }

    /// Issue a command whose reply may carry data inline or as a
    /// PREPARE_DATA stream. Used by the per-record read paths.
    pub(crate) async fn read_command_data(
        &mut self,
        command: Command,
        payload: Bytes,
    ) -> Result<Vec<u8>> {
        let reply = self.execute(command, payload).await?;
        match reply.code {
            Command::Data | Command::AckData => Ok(reply.payload.to_vec()),
            Command::PrepareData => self.recv_prepared(&reply).await,
            Command::AckOk => Ok(Vec::new()),
            other => Err(Error::Transfer {
                command,
                detail: format!("unexpected reply {other}"),
            }),
        }
    }

    /// Release the device-side staging buffer.
    pub async fn free_data(&mut self) -> Result<()> {
        self.execute(Command::FreeData, Bytes::new()).await?;
        Ok(())
    }

    /// Push a blob to the device: PREPARE_DATA with the total size, then
    /// fixed-size DATA chunks, each individually acknowledged.
    pub(crate) async fn send_with_buffer(&mut self, data: &[u8]) -> Result<()> {
        self.free_data().await?;

        let mut payload = BytesMut::with_capacity(4);
        payload.put_u32_le(data.len() as u32);
        self.execute(Command::PrepareData, payload.freeze()).await?;

        for chunk in data.chunks(UPLOAD_CHUNK) {
            self.execute(Command::Data, Bytes::copy_from_slice(chunk))
                .await?;
        }
        debug!(total = data.len(), "upload staged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{connected_device, reply_frame, MockTransport, MOCK_SESSION};
    use pretty_assertions::assert_eq;

    fn ok(payload: &[u8]) -> Vec<u8> {
        reply_frame(Command::AckOk, MOCK_SESSION, 1, payload)
    }

    fn data(payload: &[u8]) -> Vec<u8> {
        reply_frame(Command::Data, MOCK_SESSION, 1, payload)
    }

    #[tokio::test]
    async fn test_small_set_arrives_inline() {
        let mut mock = MockTransport::new(false);
        mock.push_reply(data(b"inline-bytes"));
        let mut device = connected_device(mock.clone());

        let bytes = device
            .read_with_buffer(Command::UserTempRrq, 5, 0)
            .await
            .unwrap();
        assert_eq!(bytes, b"inline-bytes");

        // Only the PREPARE_BUFFER request went out
        assert_eq!(mock.sent_commands(), vec![1503]);
        let sent = mock.sent();
        assert_eq!(&sent[0][8..11], &[1, 9, 0]);
    }

    #[tokio::test]
    async fn test_staged_read_drains_buffer_then_frees_it() {
        let payload: Vec<u8> = (0u8..=255).cycle().take(40_000).collect();

        let mut mock = MockTransport::new(false);
        let mut announce = vec![0u8];
        announce.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        mock.push_reply(ok(&announce));
        // 40000 bytes over UDP: chunks of 16384, 16384, 7232
        mock.push_reply(data(&payload[..16384]));
        mock.push_reply(data(&payload[16384..32768]));
        mock.push_reply(data(&payload[32768..]));
        mock.push_reply(ok(&[]));
        let mut device = connected_device(mock.clone());

        let bytes = device
            .read_with_buffer(Command::AttLogRrq, 1, 0)
            .await
            .unwrap();
        assert_eq!(bytes, payload);
        assert_eq!(mock.sent_commands(), vec![1503, 1504, 1504, 1504, 1502]);

        // Chunk offsets advance by the UDP ceiling
        let sent = mock.sent();
        assert_eq!(&sent[2][8..12], &16384i32.to_le_bytes());
    }

    #[tokio::test]
    async fn test_chunk_as_prepared_stream() {
        let mut mock = MockTransport::new(false);
        let mut announce = vec![0u8];
        announce.extend_from_slice(&10u32.to_le_bytes());
        mock.push_reply(ok(&announce));
        mock.push_reply(reply_frame(
            Command::PrepareData,
            MOCK_SESSION,
            1,
            &10u32.to_le_bytes(),
        ));
        mock.push_reply(data(b"split"));
        mock.push_reply(data(b"parts"));
        mock.push_reply(ok(&[]));
        mock.push_reply(ok(&[])); // FREE_DATA
        let mut device = connected_device(mock);

        let bytes = device.read_with_buffer(Command::DbRrq, 2, 0).await.unwrap();
        assert_eq!(bytes, b"splitparts");
    }

    #[tokio::test]
    async fn test_chunk_retries_then_fails() {
        let mut mock = MockTransport::new(false);
        let mut announce = vec![0u8];
        announce.extend_from_slice(&100u32.to_le_bytes());
        mock.push_reply(ok(&announce));
        for _ in 0..CHUNK_RETRIES {
            mock.push_reply(reply_frame(Command::AckError, MOCK_SESSION, 1, &[]));
        }
        let mut device = connected_device(mock);

        let err = device
            .read_with_buffer(Command::AttLogRrq, 1, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Refused { .. }));
    }

    #[tokio::test]
    async fn test_prepared_stream_closed_early_is_an_error() {
        let mut mock = MockTransport::new(false);
        mock.push_reply(reply_frame(
            Command::PrepareData,
            MOCK_SESSION,
            1,
            &100u32.to_le_bytes(),
        ));
        mock.push_reply(data(b"only-a-little"));
        mock.push_reply(ok(&[]));
        let mut device = connected_device(mock);

        let err = device
            .read_command_data(Command::UserTempRrq, Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transfer { .. }));
    }

    #[tokio::test]
    async fn test_upload_chunks_and_announces_size() {
        let blob: Vec<u8> = vec![7u8; 2500];

        let mut mock = MockTransport::new(false);
        mock.push_reply(ok(&[])); // FREE_DATA
        mock.push_reply(ok(&[])); // PREPARE_DATA
        mock.push_reply(ok(&[])); // 3 chunks of 1024/1024/452
        mock.push_reply(ok(&[]));
        mock.push_reply(ok(&[]));
        let mut device = connected_device(mock.clone());

        device.send_with_buffer(&blob).await.unwrap();
        assert_eq!(mock.sent_commands(), vec![1502, 1500, 1501, 1501, 1501]);

        let sent = mock.sent();
        assert_eq!(&sent[1][8..], &2500u32.to_le_bytes());
        assert_eq!(sent[2].len() - 8, 1024);
        assert_eq!(sent[4].len() - 8, 452);
    }
}

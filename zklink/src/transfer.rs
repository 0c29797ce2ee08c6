//! Bulk record reads
//!
//! ```text
//! CMD_DISABLEDEVICE
//! CMD_DATA_WRRQ(descriptor)
//!   ├─ CMD_DATA: [u32 byte count][records]                   small sets
//!   └─ CMD_ACK_OK: size hint at data[1..5]                   large sets
//!        CMD_DATA_RDY([u32 0][u32 size])
//!          ← CMD_PREPARE_DATA, CMD_DATA, CMD_ACK_OK          all under the DATA_RDY reply number
//!        CMD_FREE_DATA
//! CMD_ENABLEDEVICE                                           always
//! ```

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use tracing::{debug, info};

use zklink_core::Command;
use zklink_core::constants::read_requests;
use zklink_types::{AttendanceRecord, UserRecord, decode_record_array};

use crate::commands::Refresh;
use crate::device::Device;
use crate::error::{Error, Result};

impl Device {
    /// Every user stored on the terminal
    pub async fn read_all_users(&self) -> Result<Vec<UserRecord>> {
        let data = self.read_bulk(&read_requests::USERS).await?;
        let users: Vec<UserRecord> = decode_record_array(&data)?;

        info!(device = %self.id(), "Read {} users", users.len());
        Ok(users)
    }

    /// The full attendance log
    ///
    /// Slots with a zero time are dropped unless
    /// [`ConnectOptions::skip_empty_attendance`](crate::ConnectOptions::skip_empty_attendance)
    /// is turned off.
    pub async fn read_attendance_log(&self) -> Result<Vec<AttendanceRecord>> {
        let data = self.read_bulk(&read_requests::ATTENDANCE).await?;
        let mut records: Vec<AttendanceRecord> = decode_record_array(&data)?;

        if self.options().skip_empty_attendance {
            let before = records.len();
            records.retain(|record| !record.is_empty());
            if records.len() != before {
                debug!(device = %self.id(), "Skipped {} empty records", before - records.len());
            }
        }

        info!(device = %self.id(), "Read {} attendance records", records.len());
        Ok(records)
    }

    /// Run one transfer with the device disabled; enable is sent even on failure
    async fn read_bulk(&self, descriptor: &[u8]) -> Result<Bytes> {
        self.disable_device().await?;

        let result = self.fetch(descriptor).await;
        let enabled = self.enable_device().await;

        let data = result?;
        enabled?;
        Ok(data)
    }

    async fn fetch(&self, descriptor: &[u8]) -> Result<Bytes> {
        let reply = self.request(Command::DataWriteRequest, descriptor).await?;

        match reply.kind() {
            Some(Command::Data) => {
                debug!(device = %self.id(), "Single packet transfer, {} bytes", reply.data.len());
                Ok(reply.data)
            }
            Some(Command::AckOk) => {
                if reply.data.len() < 5 {
                    return Err(zklink_types::Error::Truncated {
                        expected: 5,
                        actual: reply.data.len(),
                    }
                    .into());
                }
                let size = LittleEndian::read_u32(&reply.data[1..5]);
                debug!(device = %self.id(), "Chunked transfer, {} bytes announced", size);

                let result = self.fetch_prepared(size).await;
                let freed = self.refresh(Refresh::Buffer).await;

                let data = result?;
                freed?;
                Ok(data)
            }
            _ => {
                self.expect_success(Command::DataWriteRequest, &reply)?;
                // ACK_DATA without a record array
                Err(Error::UnexpectedReply {
                    command: Command::DataWriteRequest.into(),
                    reply: reply.command,
                })
            }
        }
    }

    /// CMD_DATA_RDY and the three replies filed under its reply number
    async fn fetch_prepared(&self, size: u32) -> Result<Bytes> {
        let mut ready = [0u8; 8];
        LittleEndian::write_u32(&mut ready[4..8], size);

        let reply_id = self.send_request(Command::DataReady, &ready).await?;

        let result = async {
            let prepare = self.await_reply(reply_id).await?;
            self.expect_reply(Command::PrepareData, prepare.command)?;

            let data = self.await_reply(reply_id).await?;
            self.expect_reply(Command::Data, data.command)?;

            let done = self.await_reply(reply_id).await?;
            self.expect_success(Command::DataReady, &done)?;

            Ok(data.data)
        }
        .await;

        if result.is_err() {
            self.discard_replies(reply_id);
        }
        result
    }

    fn expect_reply(&self, expected: Command, received: u16) -> Result<()> {
        if received == expected {
            return Ok(());
        }
        Err(Error::UnexpectedReply {
            command: Command::DataReady.into(),
            reply: received,
        })
    }
}

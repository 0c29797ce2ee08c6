//! Device operations built on the request/reply exchange

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, info, warn};

use zklink_core::Command;
use zklink_core::constants::options::{ALPHANUMERIC_PIN, PIN_WIDTH};
use zklink_types::{EnrollRequest, EventMask, FixedRecord, MachineStatus, Timestamp, UserRecord};

use crate::device::Device;
use crate::error::{Error, Result};

/// What a refresh command asks the device to reload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refresh {
    /// Reload stored records (CMD_REFRESHDATA)
    #[default]
    Data,
    /// Reload configuration parameters (CMD_REFRESHOPTION)
    Options,
    /// Release the transfer buffer (CMD_FREE_DATA)
    Buffer,
}

impl From<Refresh> for Command {
    fn from(refresh: Refresh) -> Self {
        match refresh {
            Refresh::Data => Command::RefreshData,
            Refresh::Options => Command::RefreshOption,
            Refresh::Buffer => Command::FreeData,
        }
    }
}

impl Device {
    /// Enable device (normal operation mode)
    pub async fn enable_device(&self) -> Result<()> {
        debug!(device = %self.id(), "Enabling device...");
        self.act(Command::EnableDevice, &[]).await
    }

    /// Disable device (fingerprint, card and keypad input are ignored)
    pub async fn disable_device(&self) -> Result<()> {
        debug!(device = %self.id(), "Disabling device...");
        self.act(Command::DisableDevice, &[]).await
    }

    pub async fn refresh(&self, what: Refresh) -> Result<()> {
        self.act(what.into(), &[]).await
    }

    /// Demote every administrator to a common user
    pub async fn clear_admins(&self) -> Result<()> {
        self.act(Command::ClearAdmin, &[]).await
    }

    /// Toggle the blinking clock separator on the screen
    pub async fn enable_clock(&self) -> Result<()> {
        self.act(Command::EnableClock, &[]).await
    }

    /// Put the device back into identification mode
    pub async fn start_identify(&self) -> Result<()> {
        self.act(Command::StartVerify, &[]).await
    }

    /// Abort a capture or enrollment in progress
    pub async fn cancel_operation(&self) -> Result<()> {
        self.act(Command::CancelCapture, &[]).await
    }

    /// Device clock
    pub async fn get_time(&self) -> Result<Timestamp> {
        let data = self.act_with_data(Command::GetTime, &[]).await?;
        if data.len() < 4 {
            return Err(zklink_types::Error::Truncated {
                expected: 4,
                actual: data.len(),
            }
            .into());
        }
        Ok(Timestamp::from_packed(LittleEndian::read_u32(&data[..4])))
    }

    /// Set the device clock from a packed time value, then refresh
    pub async fn set_time(&self, packed: u32) -> Result<()> {
        self.act(Command::SetTime, &packed.to_le_bytes()).await?;
        self.refresh(Refresh::Data).await
    }

    /// Storage counters (users, fingerprints, passwords)
    pub async fn device_status(&self) -> Result<MachineStatus> {
        let data = self.act_with_data(Command::GetFreeSizes, &[]).await?;
        Ok(MachineStatus::decode(&data)?)
    }

    /// Remove the user with the given serial number, then refresh
    pub async fn delete_user(&self, serial: u16) -> Result<()> {
        info!(device = %self.id(), "Deleting user #{}", serial);
        self.act(Command::DeleteUser, &serial.to_le_bytes()).await?;
        self.refresh(Refresh::Data).await
    }

    /// Create or overwrite a user
    ///
    /// The device is disabled for the write and enabled again afterwards,
    /// even when the write fails.
    pub async fn set_user(&self, user: &UserRecord) -> Result<()> {
        let payload = user.encode()?;

        self.disable_device().await?;

        let result = async {
            self.act(Command::UserWrq, &payload).await?;
            self.refresh(Refresh::Data).await
        }
        .await;

        let enabled = self.enable_device().await;
        result.and(enabled)
    }

    /// Ask the device to push real-time events of the given classes
    pub async fn init_realtime(&self, mask: EventMask) -> Result<()> {
        info!(device = %self.id(), "Registering for real-time events {:?}", mask);
        self.act(Command::RegEvent, &mask.bits().to_le_bytes()).await
    }

    /// Read one configuration value, e.g. `~PIN2Width`
    ///
    /// The device answers `key=value`; only `value` is returned. A device that
    /// does not know the key answers ACK_ERROR, reported as [`Error::Unsupported`].
    pub async fn read_config(&self, key: &str) -> Result<String> {
        let mut query = Vec::with_capacity(key.len() + 1);
        query.extend_from_slice(key.as_bytes());
        query.push(0);

        let reply = self.request(Command::OptionsRrq, &query).await?;
        if reply.command == Command::AckError {
            return Err(Error::Unsupported {
                query: key.to_owned(),
            });
        }
        self.expect_success(Command::OptionsRrq, &reply)?;

        let end = reply.data.iter().position(|&b| b == 0).unwrap_or(reply.data.len());
        let text = String::from_utf8_lossy(&reply.data[..end]);
        let value = text.split_once('=').map_or(&*text, |(_, value)| value);

        debug!(device = %self.id(), "{} = {}", key, value);
        Ok(value.trim().to_owned())
    }

    /// Start fingerprint enrollment for a user id
    ///
    /// Checks the id against the device's pin width and, for ids with
    /// letters, whether alphanumeric pins are enabled. Afterwards the device
    /// is put back into identification mode.
    pub async fn enroll_user(&self, request: &EnrollRequest) -> Result<()> {
        let payload = request.encode()?;

        let width = self.read_config(PIN_WIDTH).await?;
        match width.parse::<usize>() {
            Ok(width) if request.user_id.len() > width => {
                return Err(Error::Validation(format!(
                    "user id {:?} is longer than the device pin width {}",
                    request.user_id, width
                )));
            }
            Ok(_) => {}
            Err(_) => warn!(device = %self.id(), "Unreadable {} value {:?}", PIN_WIDTH, width),
        }

        if !request.is_numeric() {
            let enabled = self.read_config(ALPHANUMERIC_PIN).await?;
            if enabled != "1" {
                return Err(Error::Validation(format!(
                    "user id {:?} has letters but the device accepts digits only",
                    request.user_id
                )));
            }
        }

        self.cancel_operation().await?;

        info!(
            device = %self.id(),
            "Enrolling finger {} for user {}",
            request.finger_index, request.user_id
        );
        self.act(Command::StartEnroll, &payload).await?;

        self.start_identify().await
    }

    /// Restart the terminal; the connection is closed afterwards
    pub async fn restart(&self) -> Result<()> {
        warn!(device = %self.id(), "Restarting device...");
        self.act(Command::Restart, &[]).await?;
        self.close().await;
        Ok(())
    }

    /// Power the terminal off; the connection is closed afterwards
    pub async fn power_off(&self) -> Result<()> {
        warn!(device = %self.id(), "Powering off device...");
        self.act(Command::PowerOff, &[]).await?;
        self.close().await;
        Ok(())
    }
}

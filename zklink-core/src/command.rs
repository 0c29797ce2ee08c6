//! Protocol command and reply codes

use std::fmt;

use crate::error::{Error, Result};

/// Protocol command codes
///
/// Requests sent by the client and the acknowledgement codes the device
/// answers with share one 16-bit namespace.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    // Connection commands
    Connect = 1000,
    Exit = 1001,
    EnableDevice = 1002,
    DisableDevice = 1003,
    Restart = 1004,
    PowerOff = 1005,
    Sleep = 1006,
    Awaken = 1007,

    // Device interaction
    CaptureFinger = 1008,
    TestTemp = 1009,
    RefreshData = 1013,
    RefreshOption = 1014,

    // Authentication
    Auth = 1102,

    // Data transfer
    PrepareData = 1500,
    Data = 1501,
    FreeData = 1502,
    DataWriteRequest = 1503,
    DataReady = 1504,

    // Database operations
    UserWrq = 8,
    OptionsRrq = 11,
    OptionsWrq = 12,
    DeleteUser = 18,
    ClearAdmin = 20,

    // Device status
    GetFreeSizes = 50,
    EnableClock = 57,
    StartVerify = 60,
    StartEnroll = 61,
    CancelCapture = 62,

    // Time operations
    GetTime = 201,
    SetTime = 202,

    // Real-time events
    RegEvent = 500,

    // Response commands (from device)
    AckOk = 2000,
    AckError = 2001,
    AckData = 2002,
    AckRetry = 2003,
    AckRepeat = 2004,
    AckUnauth = 2005,
    AckUnknown = 0xFFFF,
    AckErrorCmd = 0xFFFD,
    AckErrorInit = 0xFFFC,
    AckErrorData = 0xFFFB,
}

impl Command {
    /// Check if this is a request command (from PC to device)
    pub fn is_request(self) -> bool {
        !self.is_response()
    }

    /// Check if this is a response command (from device to PC)
    pub fn is_response(self) -> bool {
        matches!(
            self,
            Self::AckOk
                | Self::AckError
                | Self::AckData
                | Self::AckRetry
                | Self::AckRepeat
                | Self::AckUnauth
                | Self::AckUnknown
                | Self::AckErrorCmd
                | Self::AckErrorInit
                | Self::AckErrorData
        )
    }

    /// Check if this is a success response
    pub fn is_success(self) -> bool {
        matches!(self, Self::AckOk | Self::AckData)
    }

    /// Check if this is an error response
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::AckError | Self::AckErrorCmd | Self::AckErrorInit | Self::AckErrorData
        )
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::Connect => "CMD_CONNECT",
            Self::Exit => "CMD_EXIT",
            Self::EnableDevice => "CMD_ENABLEDEVICE",
            Self::DisableDevice => "CMD_DISABLEDEVICE",
            Self::Restart => "CMD_RESTART",
            Self::PowerOff => "CMD_POWEROFF",
            Self::Sleep => "CMD_SLEEP",
            Self::Awaken => "CMD_AWAKEN",
            Self::CaptureFinger => "CMD_CAPTUREFINGER",
            Self::TestTemp => "CMD_TEST_TEMP",
            Self::RefreshData => "CMD_REFRESHDATA",
            Self::RefreshOption => "CMD_REFRESHOPTION",
            Self::Auth => "CMD_AUTH",
            Self::PrepareData => "CMD_PREPARE_DATA",
            Self::Data => "CMD_DATA",
            Self::FreeData => "CMD_FREE_DATA",
            Self::DataWriteRequest => "CMD_DATA_WRRQ",
            Self::DataReady => "CMD_DATA_RDY",
            Self::UserWrq => "CMD_USER_WRQ",
            Self::OptionsRrq => "CMD_OPTIONS_RRQ",
            Self::OptionsWrq => "CMD_OPTIONS_WRQ",
            Self::DeleteUser => "CMD_DELETE_USER",
            Self::ClearAdmin => "CMD_CLEAR_ADMIN",
            Self::GetFreeSizes => "CMD_GET_FREE_SIZES",
            Self::EnableClock => "CMD_ENABLE_CLOCK",
            Self::StartVerify => "CMD_STARTVERIFY",
            Self::StartEnroll => "CMD_STARTENROLL",
            Self::CancelCapture => "CMD_CANCELCAPTURE",
            Self::GetTime => "CMD_GET_TIME",
            Self::SetTime => "CMD_SET_TIME",
            Self::RegEvent => "CMD_REG_EVENT",
            Self::AckOk => "CMD_ACK_OK",
            Self::AckError => "CMD_ACK_ERROR",
            Self::AckData => "CMD_ACK_DATA",
            Self::AckRetry => "CMD_ACK_RETRY",
            Self::AckRepeat => "CMD_ACK_REPEAT",
            Self::AckUnauth => "CMD_ACK_UNAUTH",
            Self::AckUnknown => "CMD_ACK_UNKNOWN",
            Self::AckErrorCmd => "CMD_ACK_ERROR_CMD",
            Self::AckErrorInit => "CMD_ACK_ERROR_INIT",
            Self::AckErrorData => "CMD_ACK_ERROR_DATA",
        }
    }

    /// Name of a raw code as seen on the wire, or `"UNKNOWN"` for codes outside the table
    pub fn name_of(code: u16) -> &'static str {
        Self::try_from(code).map(Self::name).unwrap_or("UNKNOWN")
    }
}

impl From<Command> for u16 {
    fn from(cmd: Command) -> u16 {
        cmd as u16
    }
}

impl TryFrom<u16> for Command {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            1000 => Ok(Self::Connect),
            1001 => Ok(Self::Exit),
            1002 => Ok(Self::EnableDevice),
            1003 => Ok(Self::DisableDevice),
            1004 => Ok(Self::Restart),
            1005 => Ok(Self::PowerOff),
            1006 => Ok(Self::Sleep),
            1007 => Ok(Self::Awaken),
            1008 => Ok(Self::CaptureFinger),
            1009 => Ok(Self::TestTemp),
            1013 => Ok(Self::RefreshData),
            1014 => Ok(Self::RefreshOption),
            1102 => Ok(Self::Auth),
            1500 => Ok(Self::PrepareData),
            1501 => Ok(Self::Data),
            1502 => Ok(Self::FreeData),
            1503 => Ok(Self::DataWriteRequest),
            1504 => Ok(Self::DataReady),
            8 => Ok(Self::UserWrq),
            11 => Ok(Self::OptionsRrq),
            12 => Ok(Self::OptionsWrq),
            18 => Ok(Self::DeleteUser),
            20 => Ok(Self::ClearAdmin),
            50 => Ok(Self::GetFreeSizes),
            57 => Ok(Self::EnableClock),
            60 => Ok(Self::StartVerify),
            61 => Ok(Self::StartEnroll),
            62 => Ok(Self::CancelCapture),
            201 => Ok(Self::GetTime),
            202 => Ok(Self::SetTime),
            500 => Ok(Self::RegEvent),
            2000 => Ok(Self::AckOk),
            2001 => Ok(Self::AckError),
            2002 => Ok(Self::AckData),
            2003 => Ok(Self::AckRetry),
            2004 => Ok(Self::AckRepeat),
            2005 => Ok(Self::AckUnauth),
            0xFFFF => Ok(Self::AckUnknown),
            0xFFFD => Ok(Self::AckErrorCmd),
            0xFFFC => Ok(Self::AckErrorInit),
            0xFFFB => Ok(Self::AckErrorData),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl PartialEq<Command> for u16 {
    fn eq(&self, other: &Command) -> bool {
        *self == *other as u16
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u16)
    }
}

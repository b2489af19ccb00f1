//! Protocol command definitions

use std::fmt;

use crate::error::{Error, Result};

/// Protocol command codes
///
/// Values are fixed by the device firmware and not renegotiable.
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

    // Device interaction
    RefreshData = 1013,
    TestVoice = 1017,

    // Device information
    GetVersion = 1100,
    Auth = 1102,

    // Data transfer
    PrepareData = 1500,
    Data = 1501,
    FreeData = 1502,
    PrepareBuffer = 1503,
    ReadBuffer = 1504,

    // Database operations
    DbRrq = 7,
    UserWrq = 8,
    UserTempRrq = 9,
    OptionsRrq = 11,
    AttLogRrq = 13,
    ClearData = 14,
    ClearAttLog = 15,
    DeleteUser = 18,
    DeleteUserTemp = 19,
    Unlock = 31,

    // Device status & capture
    GetFreeSizes = 50,
    StartVerify = 60,
    StartEnroll = 61,
    CancelCapture = 62,
    GetPinWidth = 69,

    // Template upload commit
    SaveUserTemps = 110,

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

    /// Check if this reply lets the exchange proceed: plain success, a
    /// bulk-size announcement, or an inline data payload.
    pub fn is_success(self) -> bool {
        matches!(self, Self::AckOk | Self::AckData | Self::PrepareData | Self::Data)
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
            Self::RefreshData => "CMD_REFRESHDATA",
            Self::TestVoice => "CMD_TESTVOICE",
            Self::GetVersion => "CMD_GET_VERSION",
            Self::Auth => "CMD_AUTH",
            Self::PrepareData => "CMD_PREPARE_DATA",
            Self::Data => "CMD_DATA",
            Self::FreeData => "CMD_FREE_DATA",
            Self::PrepareBuffer => "CMD_PREPARE_BUFFER",
            Self::ReadBuffer => "CMD_READ_BUFFER",
            Self::DbRrq => "CMD_DB_RRQ",
            Self::UserWrq => "CMD_USER_WRQ",
            Self::UserTempRrq => "CMD_USERTEMP_RRQ",
            Self::OptionsRrq => "CMD_OPTIONS_RRQ",
            Self::AttLogRrq => "CMD_ATTLOG_RRQ",
            Self::ClearData => "CMD_CLEAR_DATA",
            Self::ClearAttLog => "CMD_CLEAR_ATTLOG",
            Self::DeleteUser => "CMD_DELETE_USER",
            Self::DeleteUserTemp => "CMD_DELETE_USERTEMP",
            Self::Unlock => "CMD_UNLOCK",
            Self::GetFreeSizes => "CMD_GET_FREE_SIZES",
            Self::StartVerify => "CMD_STARTVERIFY",
            Self::StartEnroll => "CMD_STARTENROLL",
            Self::CancelCapture => "CMD_CANCELCAPTURE",
            Self::GetPinWidth => "CMD_GET_PINWIDTH",
            Self::SaveUserTemps => "CMD_SAVE_USERTEMPS",
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
            1013 => Ok(Self::RefreshData),
            1017 => Ok(Self::TestVoice),
            1100 => Ok(Self::GetVersion),
            1102 => Ok(Self::Auth),
            1500 => Ok(Self::PrepareData),
            1501 => Ok(Self::Data),
            1502 => Ok(Self::FreeData),
            1503 => Ok(Self::PrepareBuffer),
            1504 => Ok(Self::ReadBuffer),
            7 => Ok(Self::DbRrq),
            8 => Ok(Self::UserWrq),
            9 => Ok(Self::UserTempRrq),
            11 => Ok(Self::OptionsRrq),
            13 => Ok(Self::AttLogRrq),
            14 => Ok(Self::ClearData),
            15 => Ok(Self::ClearAttLog),
            18 => Ok(Self::DeleteUser),
            19 => Ok(Self::DeleteUserTemp),
            31 => Ok(Self::Unlock),
            50 => Ok(Self::GetFreeSizes),
            60 => Ok(Self::StartVerify),
            61 => Ok(Self::StartEnroll),
            62 => Ok(Self::CancelCapture),
            69 => Ok(Self::GetPinWidth),
            110 => Ok(Self::SaveUserTemps),
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

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_conversion() {
        assert_eq!(u16::from(Command::Connect), 1000);
        assert_eq!(Command::try_from(1000).unwrap(), Command::Connect);
        assert_eq!(Command::try_from(1503).unwrap(), Command::PrepareBuffer);
    }

    #[test]
    fn test_command_is_response() {
        assert!(Command::AckOk.is_response());
        assert!(Command::AckUnauth.is_response());
        assert!(!Command::Connect.is_response());
    }

    #[test]
    fn test_command_is_success() {
        assert!(Command::AckOk.is_success());
        assert!(Command::PrepareData.is_success());
        assert!(Command::Data.is_success());
        assert!(!Command::AckError.is_success());
        assert!(!Command::AckUnauth.is_success());
    }

    #[test]
    fn test_unknown_command() {
        let result = Command::try_from(9999);
        assert!(matches!(result, Err(Error::UnknownCommand(9999))));
    }
}

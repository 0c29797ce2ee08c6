//! High-level error types

use zklink_core::Command;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] zklink_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] zklink_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] zklink_types::Error),

    #[error("Device not connected")]
    NotConnected,

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Device already registered: {0}")]
    AlreadyRegistered(String),

    #[error("{} rejected by device: {}", code_name(.command), code_name(.code))]
    Device { command: u16, code: u16 },

    #[error("Configuration query not supported: {query}")]
    Unsupported { query: String },

    #[error("Timed out waiting for reply")]
    Timeout,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Unexpected reply to {}: {}", code_name(.command), code_name(.reply))]
    UnexpectedReply { command: u16, reply: u16 },

    #[error("Validation error: {0}")]
    Validation(String),
}

fn code_name(code: &u16) -> &'static str {
    Command::name_of(*code)
}

impl Error {
    /// Worth retrying on the same connection
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Timeout => true,
            Error::Device { code, .. } => {
                *code == u16::from(Command::AckRetry) || *code == u16::from(Command::AckRepeat)
            }
            Error::Core(e) => !e.requires_reconnect(),
            _ => false,
        }
    }

    /// The connection is unusable and has to be re-established
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Error::NotConnected | Error::ConnectionClosed | Error::AuthenticationFailed => true,
            Error::Transport(e) => e.is_disconnect(),
            Error::Core(e) => e.requires_reconnect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_display() {
        let err = Error::Device {
            command: Command::DisableDevice.into(),
            code: Command::AckError.into(),
        };
        assert_eq!(err.to_string(), "CMD_DISABLEDEVICE rejected by device: CMD_ACK_ERROR");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::Timeout.is_recoverable());
        assert!(!Error::Timeout.requires_reconnect());
        assert!(Error::ConnectionClosed.requires_reconnect());
        assert!(
            Error::Device {
                command: 1003,
                code: Command::AckRetry.into()
            }
            .is_recoverable()
        );
        assert!(
            !Error::Unsupported {
                query: "~PIN2Width".into()
            }
            .is_recoverable()
        );
    }
}

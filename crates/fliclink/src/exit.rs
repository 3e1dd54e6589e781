use std::fmt;
use std::io;

use fliclink_frame::FrameError;
use fliclink_protocol::ProtocolError;
use fliclink_session::{SessionError, StateError};
use fliclink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::RecordTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed | FrameError::ClosedMidRecord { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

pub fn protocol_error(context: &str, err: ProtocolError) -> CliError {
    let code = match err {
        ProtocolError::MalformedAddress { .. } => USAGE,
        _ => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn state_error(context: &str, err: StateError) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::Protocol(err) => protocol_error(context, err),
        SessionError::State(err) => state_error(context, err),
        SessionError::ReadTimeout(err) => io_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_to_exit_codes() {
        let err = io_error("x", io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(err.code, TIMEOUT);
        let err = io_error("x", io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn malformed_address_is_a_usage_error() {
        let err = "zz".parse::<fliclink_protocol::BdAddr>().unwrap_err();
        assert_eq!(protocol_error("bad address", err).code, USAGE);
    }

    #[test]
    fn session_errors_route_by_layer() {
        let err = session_error("recv", SessionError::Frame(FrameError::ConnectionClosed));
        assert_eq!(err.code, FAILURE);
        assert!(err.message.starts_with("recv: "));

        let err = session_error(
            "send",
            SessionError::State(StateError::UnknownId {
                class: fliclink_protocol::IdClass::Scanner,
                id: 1,
            }),
        );
        assert_eq!(err.code, USAGE);

        let err = session_error(
            "recv",
            SessionError::ReadTimeout(io::Error::from(io::ErrorKind::WouldBlock)),
        );
        assert_eq!(err.code, TIMEOUT);
    }
}

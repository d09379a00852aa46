use std::fmt;
use std::io;

use rachis_protocol::DecodeError;
use rachis_session::{NegotiationError, SessionError};
use rachis_transport::TransportError;

// Exit codes follow the sysexits / timeout(1) conventions.
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

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
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
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::InvalidData => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match err {
        TransportError::InvalidOrigin { .. } => USAGE,
        TransportError::Disentangled { .. } | TransportError::FrameDetached => FAILURE,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn decode_error(context: &str, err: DecodeError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn negotiation_error(context: &str, err: NegotiationError) -> CliError {
    match err {
        NegotiationError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        NegotiationError::ProtocolViolation { .. } | NegotiationError::Protocol(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        NegotiationError::Transport(err) => transport_error(context, err),
        NegotiationError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        NegotiationError::Listener(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Negotiation(err) => negotiation_error(context, err),
        SessionError::Decode(err) => decode_error(context, err),
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Protocol(_) | SessionError::Faulted(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        SessionError::MissingPayload { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        SessionError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

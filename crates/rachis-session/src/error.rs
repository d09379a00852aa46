use rachis_protocol::{DecodeError, ProtocolError};
use rachis_transport::TransportError;

/// Errors that end a channel negotiation attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    /// No round was accepted and confirmed within the proposal budget.
    #[error("{remote} did not respond after {proposals} proposals")]
    Timeout { remote: String, proposals: u32 },

    /// The remote replied with something the handshake does not allow.
    #[error("{remote} did not cooperate as expected: {reason}")]
    ProtocolViolation { remote: String, reason: String },

    /// Frame or port failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Encoding one of our own messages failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A round listener task panicked or was aborted.
    #[error("round listener failed: {0}")]
    Listener(String),

    /// Rejected configuration.
    #[error("invalid negotiator config: {0}")]
    InvalidConfig(String),
}

/// Errors surfaced by an archive session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The viewer channel could not be negotiated.
    #[error("channel negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),

    /// The archive payload is not valid base64.
    #[error("archive payload decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The viewer sent a message outside the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Frame or port failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The render model lacks the archive entry.
    #[error("model has no string entry for '{mime}'")]
    MissingPayload { mime: String },

    /// An earlier protocol violation made the session unusable.
    #[error("session faulted: {0}")]
    Faulted(String),

    /// The session task is gone.
    #[error("session closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SessionError>;

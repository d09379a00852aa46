/// Errors decoding or encoding protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The message has no string `event` field.
    #[error("message has no event field")]
    MissingEvent,

    /// The event name is not part of the protocol for this direction.
    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    /// A known event whose fields do not match its shape.
    #[error("malformed '{event}' message: {reason}")]
    Malformed { event: String, reason: String },

    /// A known event arrived without the object it must transfer.
    #[error("'{event}' message is missing its transferred {what}")]
    MissingTransfer { event: String, what: &'static str },

    /// A known event that is not valid in the current state.
    #[error("unexpected '{event}' {context}")]
    Unexpected { event: String, context: &'static str },
}

/// Malformed base64 archive payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A byte outside the base64 alphabet (whitespace is skipped).
    #[error("invalid base64 byte 0x{byte:02x} at offset {offset}")]
    InvalidByte { offset: usize, byte: u8 },

    /// Trailing characters that cannot form a whole byte.
    #[error("truncated base64 payload ({trailing} dangling characters)")]
    Truncated { trailing: usize },

    /// Padding in the wrong place, or other structural problem.
    #[error("invalid base64 payload near offset {offset}: {reason}")]
    Invalid { offset: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

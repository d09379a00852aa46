/// Errors that can occur on the messaging substrate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer of a message port has been dropped.
    #[error("message port {port} is disentangled (peer dropped)")]
    Disentangled { port: u64 },

    /// A sender and receiver from different ports were reunited.
    #[error("port halves do not match (sender {sender}, receiver {receiver})")]
    PortMismatch { sender: u64, receiver: u64 },

    /// The embedded frame is gone.
    #[error("embedded frame detached")]
    FrameDetached,

    /// The embedded document did not finish loading.
    #[error("embedded frame failed to load: {0}")]
    LoadFailed(String),

    /// The given URL has no usable (tuple) origin.
    #[error("invalid origin '{input}': {reason}")]
    InvalidOrigin { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, TransportError>;

//! Embed Rachis result archives (`.qza` / `.qzv`) in a trusted viewer.
//!
//! The host points an embedded frame at the viewer, negotiates a private
//! message channel with it, and sends the archive bytes over that channel
//! exactly once. The viewer reports its content height back so the host can
//! size the frame's container.
//!
//! # Crate Structure
//!
//! - [`transport`]: origins, message ports and the embedded frame abstraction
//! - [`protocol`]: wire events and the archive payload codec
//! - [`session`]: channel negotiation and archive delivery (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use rachis_transport::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use rachis_protocol::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use rachis_session::*;
}

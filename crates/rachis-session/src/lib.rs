//! Viewer session management for Rachis result archives.
//!
//! An [`ArchiveSession`] takes ownership of an embedded frame, points it at
//! the trusted viewer and negotiates a private channel with that origin. The
//! archive goes over the channel at most once, and the viewer's size reports
//! are applied to the host container for as long as the session lives.

pub mod config;
pub mod container;
pub mod error;
pub mod loopback;
pub mod mime;
pub mod negotiator;
pub mod renderer;
pub mod session;

pub use config::{
    NegotiatorConfig, SessionConfig, DEFAULT_MAX_PROPOSALS, DEFAULT_PROPOSAL_INTERVAL,
    DEFAULT_RESIZE_MARGIN_PX, DEFAULT_VIEWER_URL,
};
pub use container::{Container, MemoryContainer};
pub use error::{NegotiationError, Result, SessionError};
pub use loopback::{LoopbackBehavior, LoopbackReport, LoopbackViewer};
pub use mime::{
    is_archive_path, CLASS_NAME, FILE_EXTENSIONS, FILE_TYPE_NAME, MIME_TYPE, RENDERER_RANK,
    RENDERER_SAFE,
};
pub use negotiator::{negotiate, NegotiatedChannel};
pub use renderer::{ArchiveRenderer, MimeModel};
pub use session::{ArchiveSession, ChannelState, Delivery};

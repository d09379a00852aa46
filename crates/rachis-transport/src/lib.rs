//! Cross-origin messaging primitives.
//!
//! Models the pieces of the browser messaging substrate the archive viewer
//! relies on:
//! - entangled [`MessagePort`] pairs created by a [`MessageChannel`]
//! - [`Envelope`]s carrying structured data plus transferred objects
//! - an [`EmbeddedFrame`] that can only be posted to with an explicit
//!   target [`Origin`]
//!
//! [`memory`] provides an in-process frame used by the loopback viewer and
//! by tests. This is the lowest layer; everything else builds on it.

pub mod error;
pub mod frame;
pub mod memory;
pub mod origin;
pub mod port;

pub use error::{Result, TransportError};
pub use frame::{EmbeddedFrame, FrameAttributes};
pub use memory::{memory_frame, MemoryFrame, PostedMessage, RemoteWindow};
pub use origin::Origin;
pub use port::{Envelope, MessageChannel, MessagePort, PortReceiver, PortSender, Transferable};

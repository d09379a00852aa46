//! Wire protocol between the host and the embedded archive viewer.
//!
//! Every message is a JSON object discriminated by its `event` field:
//! - host → frame: `SESSION_PROPOSE`, `SESSION_CONFIRM`, `BLOB_ARCHIVE`
//! - frame → host: `SESSION_ACCEPT`, `SESSION_READY`, `inner_size`
//!
//! Ports and archive bytes travel in the envelope's transfer list, never
//! inside the JSON data.

pub mod archive;
pub mod error;
pub mod event;
pub mod token;

pub use archive::{decode_archive, encode_archive, ArchiveBlob, DECODE_CHUNK_CHARS};
pub use error::{DecodeError, ProtocolError, Result};
pub use event::{
    HostMessage, RemoteMessage, EVENT_BLOB_ARCHIVE, EVENT_INNER_SIZE, EVENT_SESSION_ACCEPT,
    EVENT_SESSION_CONFIRM, EVENT_SESSION_PROPOSE, EVENT_SESSION_READY,
};
pub use token::{RoundToken, SessionId};

use bytes::Bytes;
use rachis_transport::{Envelope, MessagePort, Transferable};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, Result};
use crate::token::{RoundToken, SessionId};

/// host → frame: offer a candidate channel endpoint.
pub const EVENT_SESSION_PROPOSE: &str = "SESSION_PROPOSE";
/// frame → host: remote accepts a candidate.
pub const EVENT_SESSION_ACCEPT: &str = "SESSION_ACCEPT";
/// host → frame: host confirms the accepted candidate.
pub const EVENT_SESSION_CONFIRM: &str = "SESSION_CONFIRM";
/// frame → host: remote is ready, handshake complete.
pub const EVENT_SESSION_READY: &str = "SESSION_READY";
/// host → frame: the decoded archive.
pub const EVENT_BLOB_ARCHIVE: &str = "BLOB_ARCHIVE";
/// frame → host: rendered content height.
pub const EVENT_INNER_SIZE: &str = "inner_size";

const HOST_EVENTS: &[&str] = &[
    EVENT_SESSION_PROPOSE,
    EVENT_SESSION_CONFIRM,
    EVENT_BLOB_ARCHIVE,
];
const REMOTE_EVENTS: &[&str] = &[
    EVENT_SESSION_ACCEPT,
    EVENT_SESSION_READY,
    EVENT_INNER_SIZE,
];

#[derive(Serialize, Deserialize)]
#[serde(tag = "event")]
enum HostWire {
    #[serde(rename = "SESSION_PROPOSE")]
    Propose { id: RoundToken, session: SessionId },
    #[serde(rename = "SESSION_CONFIRM")]
    Confirm { id: RoundToken, session: SessionId },
    #[serde(rename = "BLOB_ARCHIVE")]
    BlobArchive,
}

/// Messages the host posts to the embedded viewer.
#[derive(Debug)]
pub enum HostMessage {
    /// Offer `port` as the channel for round `id`.
    Propose {
        id: RoundToken,
        session: SessionId,
        port: MessagePort,
    },
    /// Confirm the round the remote accepted.
    Confirm { id: RoundToken, session: SessionId },
    /// The archive bytes, transferred.
    BlobArchive { blob: Bytes },
}

impl HostMessage {
    /// Wire name of this message.
    pub fn event(&self) -> &'static str {
        match self {
            HostMessage::Propose { .. } => EVENT_SESSION_PROPOSE,
            HostMessage::Confirm { .. } => EVENT_SESSION_CONFIRM,
            HostMessage::BlobArchive { .. } => EVENT_BLOB_ARCHIVE,
        }
    }

    pub fn into_envelope(self) -> Result<Envelope> {
        let event = self.event();
        let (wire, transfer) = match self {
            HostMessage::Propose { id, session, port } => (
                HostWire::Propose { id, session },
                Some(Transferable::Port(port)),
            ),
            HostMessage::Confirm { id, session } => (HostWire::Confirm { id, session }, None),
            HostMessage::BlobArchive { blob } => {
                (HostWire::BlobArchive, Some(Transferable::Blob(blob)))
            }
        };

        let mut envelope = Envelope::new(to_data(event, &wire)?);
        if let Some(item) = transfer {
            envelope = envelope.with_transfer(item);
        }
        Ok(envelope)
    }

    pub fn from_envelope(mut envelope: Envelope) -> Result<Self> {
        let event = classify(&envelope.data, HOST_EVENTS)?;
        let wire: HostWire = from_data(&event, &envelope.data)?;

        match wire {
            HostWire::Propose { id, session } => {
                let port = envelope
                    .take_port()
                    .ok_or_else(|| missing_transfer(&event, "port"))?;
                Ok(HostMessage::Propose { id, session, port })
            }
            HostWire::Confirm { id, session } => Ok(HostMessage::Confirm { id, session }),
            HostWire::BlobArchive => {
                let blob = envelope
                    .take_blob()
                    .ok_or_else(|| missing_transfer(&event, "blob"))?;
                Ok(HostMessage::BlobArchive { blob })
            }
        }
    }
}

/// Messages the embedded viewer posts back on a round or negotiated port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RemoteMessage {
    #[serde(rename = "SESSION_ACCEPT")]
    Accept { session: SessionId },
    #[serde(rename = "SESSION_READY")]
    Ready { session: SessionId },
    /// Content height in CSS pixels.
    #[serde(rename = "inner_size")]
    InnerSize { height: f64 },
}

impl RemoteMessage {
    pub fn event(&self) -> &'static str {
        match self {
            RemoteMessage::Accept { .. } => EVENT_SESSION_ACCEPT,
            RemoteMessage::Ready { .. } => EVENT_SESSION_READY,
            RemoteMessage::InnerSize { .. } => EVENT_INNER_SIZE,
        }
    }

    pub fn into_envelope(self) -> Result<Envelope> {
        Ok(Envelope::new(to_data(self.event(), &self)?))
    }

    /// Decode the data part of an envelope. Transferables are ignored.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let event = classify(&envelope.data, REMOTE_EVENTS)?;
        from_data(&event, &envelope.data)
    }
}

fn classify(data: &Value, known: &[&str]) -> Result<String> {
    let name = data
        .get("event")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingEvent)?;
    if !known.contains(&name) {
        return Err(ProtocolError::UnknownEvent(name.to_string()));
    }
    Ok(name.to_string())
}

fn from_data<T: DeserializeOwned>(event: &str, data: &Value) -> Result<T> {
    T::deserialize(data).map_err(|err| ProtocolError::Malformed {
        event: event.to_string(),
        reason: err.to_string(),
    })
}

fn to_data<T: Serialize>(event: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|err| ProtocolError::Malformed {
        event: event.to_string(),
        reason: err.to_string(),
    })
}

fn missing_transfer(event: &str, what: &'static str) -> ProtocolError {
    ProtocolError::MissingTransfer {
        event: event.to_string(),
        what,
    }
}

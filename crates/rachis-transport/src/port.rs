use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};

static NEXT_PORT_ID: AtomicU64 = AtomicU64::new(1);

/// An object whose ownership moves with a posted message.
pub enum Transferable {
    /// A message port; the receiver becomes its only owner.
    Port(MessagePort),
    /// Binary data.
    Blob(Bytes),
}

impl fmt::Debug for Transferable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transferable::Port(port) => f.debug_tuple("Port").field(&port.id()).finish(),
            Transferable::Blob(blob) => f
                .debug_tuple("Blob")
                .field(&format_args!("<{} bytes>", blob.len()))
                .finish(),
        }
    }
}

/// A single posted message: structured data plus its transfer list.
#[derive(Debug)]
pub struct Envelope {
    /// Structured-clone data. Always a JSON object on this protocol.
    pub data: serde_json::Value,
    /// Objects transferred alongside the data, in posting order.
    pub transfer: Vec<Transferable>,
}

impl Envelope {
    /// Envelope without transferables.
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            data,
            transfer: Vec::new(),
        }
    }

    /// Append a transferable.
    pub fn with_transfer(mut self, item: Transferable) -> Self {
        self.transfer.push(item);
        self
    }

    /// Value of the `event` field, if any.
    pub fn event_name(&self) -> Option<&str> {
        self.data.get("event").and_then(serde_json::Value::as_str)
    }

    /// Remove and return the first transferred port.
    pub fn take_port(&mut self) -> Option<MessagePort> {
        let index = self
            .transfer
            .iter()
            .position(|item| matches!(item, Transferable::Port(_)))?;
        match self.transfer.remove(index) {
            Transferable::Port(port) => Some(port),
            Transferable::Blob(_) => None,
        }
    }

    /// Remove and return the first transferred blob.
    pub fn take_blob(&mut self) -> Option<Bytes> {
        let index = self
            .transfer
            .iter()
            .position(|item| matches!(item, Transferable::Blob(_)))?;
        match self.transfer.remove(index) {
            Transferable::Blob(blob) => Some(blob),
            Transferable::Port(_) => None,
        }
    }
}

/// Two entangled message ports.
///
/// Messages posted on `port1` arrive in order on `port2` and vice versa.
#[derive(Debug)]
pub struct MessageChannel {
    pub port1: MessagePort,
    pub port2: MessagePort,
}

impl MessageChannel {
    pub fn new() -> Self {
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        let id1 = NEXT_PORT_ID.fetch_add(1, Ordering::Relaxed);
        let id2 = NEXT_PORT_ID.fetch_add(1, Ordering::Relaxed);

        Self {
            port1: MessagePort::from_parts(id1, tx2, rx1),
            port2: MessagePort::from_parts(id2, tx1, rx2),
        }
    }

    /// Consume the channel and return both ports.
    pub fn into_ports(self) -> (MessagePort, MessagePort) {
        (self.port1, self.port2)
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// One end of a [`MessageChannel`].
pub struct MessagePort {
    sender: PortSender,
    receiver: PortReceiver,
}

impl MessagePort {
    fn from_parts(
        id: u64,
        tx: mpsc::UnboundedSender<Envelope>,
        rx: mpsc::UnboundedReceiver<Envelope>,
    ) -> Self {
        Self {
            sender: PortSender { port: id, tx },
            receiver: PortReceiver { port: id, rx },
        }
    }

    /// Process-unique port id, for logs.
    pub fn id(&self) -> u64 {
        self.sender.port
    }

    /// Post a message to the entangled port.
    pub fn post(&self, envelope: Envelope) -> Result<()> {
        self.sender.post(envelope)
    }

    /// Receive the next message. Returns `None` once the peer is gone and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    /// Split into independently owned halves.
    pub fn split(self) -> (PortSender, PortReceiver) {
        (self.sender, self.receiver)
    }

    /// Put halves produced by [`MessagePort::split`] back together.
    pub fn reunite(sender: PortSender, receiver: PortReceiver) -> Result<Self> {
        if sender.port != receiver.port {
            return Err(TransportError::PortMismatch {
                sender: sender.port,
                receiver: receiver.port,
            });
        }
        Ok(Self { sender, receiver })
    }
}

impl fmt::Debug for MessagePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePort").field("id", &self.id()).finish()
    }
}

/// Sending half of a [`MessagePort`].
#[derive(Clone)]
pub struct PortSender {
    port: u64,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl PortSender {
    /// Post a message. Never blocks.
    pub fn post(&self, envelope: Envelope) -> Result<()> {
        self.tx
            .send(envelope)
            .map_err(|_| TransportError::Disentangled { port: self.port })
    }

    pub fn id(&self) -> u64 {
        self.port
    }
}

impl fmt::Debug for PortSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortSender").field("port", &self.port).finish()
    }
}

/// Receiving half of a [`MessagePort`].
pub struct PortReceiver {
    port: u64,
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl PortReceiver {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    pub fn id(&self) -> u64 {
        self.port
    }
}

impl fmt::Debug for PortReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortReceiver")
            .field("port", &self.port)
            .finish()
    }
}

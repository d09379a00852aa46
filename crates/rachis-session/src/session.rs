use rachis_protocol::{decode_archive, HostMessage, ProtocolError, RemoteMessage, SessionId};
use rachis_transport::{EmbeddedFrame, Envelope, FrameAttributes, PortSender};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::{NegotiatorConfig, SessionConfig};
use crate::container::Container;
use crate::error::{NegotiationError, Result, SessionError};
use crate::negotiator::negotiate;

/// Where the session's viewer channel stands.
#[derive(Debug, Clone)]
pub enum ChannelState {
    /// Handshake in progress.
    Negotiating,
    /// Channel established; archive may be sent.
    Open(PortSender),
    /// Handshake failed; the session can never deliver.
    Failed(NegotiationError),
    /// The viewer broke protocol after the handshake.
    Faulted(String),
}

/// Outcome of [`ArchiveSession::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The archive was posted to the viewer.
    Sent { bytes: usize },
    /// An earlier call already delivered the archive; nothing was sent.
    AlreadySent,
}

#[derive(Default)]
struct DeliveryRecord {
    sent: bool,
}

/// One embedded viewer: its negotiated channel, delivery record and
/// inbound message handling.
///
/// Negotiation starts when the session is opened. The session owns the frame:
/// dropping it stops the background task and releases both the frame and the
/// channel.
pub struct ArchiveSession {
    state: watch::Receiver<ChannelState>,
    record: Mutex<DeliveryRecord>,
    task: JoinHandle<()>,
}

impl ArchiveSession {
    /// Point `frame` at the viewer and start negotiating a channel.
    ///
    /// Must be called within a tokio runtime.
    pub fn open<F, C>(frame: F, container: C, config: &SessionConfig) -> Result<Self>
    where
        F: EmbeddedFrame + 'static,
        C: Container,
    {
        let negotiator = config.negotiator()?;
        frame.configure(&FrameAttributes::fill(config.viewer_url.clone()))?;

        let (state_tx, state) = watch::channel(ChannelState::Negotiating);
        let dispatcher = Dispatcher {
            container,
            margin_px: config.resize_margin_px,
        };
        let task = tokio::spawn(run(frame, negotiator, dispatcher, state_tx));

        Ok(Self {
            state,
            record: Mutex::new(DeliveryRecord::default()),
            task,
        })
    }

    /// Current channel state.
    pub fn state(&self) -> ChannelState {
        self.state.borrow().clone()
    }

    /// Wait until negotiation has finished and return the channel sender.
    pub async fn wait_open(&self) -> Result<PortSender> {
        let mut state = self.state.clone();
        let settled = state
            .wait_for(|state| !matches!(state, ChannelState::Negotiating))
            .await
            .map_err(|_| SessionError::Closed)?
            .clone();

        match settled {
            ChannelState::Open(sender) => Ok(sender),
            ChannelState::Failed(err) => Err(SessionError::Negotiation(err)),
            ChannelState::Faulted(reason) => Err(SessionError::Faulted(reason)),
            ChannelState::Negotiating => Err(SessionError::Closed),
        }
    }

    /// Decode `payload` (base64) and send it to the viewer, once.
    ///
    /// The first successful call sends the archive; every later call returns
    /// [`Delivery::AlreadySent`] without sending. Concurrent calls are
    /// serialized. A call that fails does not count as a delivery.
    pub async fn deliver(&self, payload: &str) -> Result<Delivery> {
        let mut record = self.record.lock().await;
        if record.sent {
            tracing::debug!("archive already delivered, skipping");
            return Ok(Delivery::AlreadySent);
        }

        let blob = decode_archive(payload)?;
        let bytes = blob.len();
        let sender = self.wait_open().await?;

        let envelope = HostMessage::BlobArchive {
            blob: blob.into_bytes(),
        }
        .into_envelope()?;
        sender.post(envelope)?;
        record.sent = true;

        tracing::info!(bytes, "archive delivered to viewer");
        Ok(Delivery::Sent { bytes })
    }

    /// Whether the archive has been sent.
    pub async fn is_delivered(&self) -> bool {
        self.record.lock().await.sent
    }
}

impl Drop for ArchiveSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for ArchiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSession")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Session task. Owns the frame until the session is dropped, whatever
/// becomes of the channel.
async fn run<F, C>(
    frame: F,
    config: NegotiatorConfig,
    dispatcher: Dispatcher<C>,
    state: watch::Sender<ChannelState>,
) where
    F: EmbeddedFrame,
    C: Container,
{
    drive(&frame, &config, &dispatcher, &state).await;
    std::future::pending::<()>().await;
}

async fn drive<F, C>(
    frame: &F,
    config: &NegotiatorConfig,
    dispatcher: &Dispatcher<C>,
    state: &watch::Sender<ChannelState>,
) where
    F: EmbeddedFrame,
    C: Container,
{
    let channel = match negotiate(frame, config).await {
        Ok(channel) => channel,
        Err(err) => {
            tracing::error!(error = %err, "viewer channel negotiation failed");
            state.send_replace(ChannelState::Failed(err));
            return;
        }
    };

    let session = channel.session();
    let (sender, mut receiver) = channel.into_port().split();
    state.send_replace(ChannelState::Open(sender));

    while let Some(envelope) = receiver.recv().await {
        if let Err(err) = dispatcher.dispatch(session, &envelope) {
            tracing::error!(%session, error = %err, "viewer broke protocol");
            state.send_replace(ChannelState::Faulted(err.to_string()));
            return;
        }
    }
    tracing::debug!(%session, "viewer channel closed");
}

/// Applies inbound viewer messages to the host.
struct Dispatcher<C> {
    container: C,
    margin_px: f64,
}

impl<C: Container> Dispatcher<C> {
    fn dispatch(&self, session: SessionId, envelope: &Envelope) -> Result<()> {
        match RemoteMessage::from_envelope(envelope)? {
            RemoteMessage::InnerSize { height } => self.resize(session, height),
            message @ (RemoteMessage::Accept { .. } | RemoteMessage::Ready { .. }) => {
                Err(ProtocolError::Unexpected {
                    event: message.event().to_string(),
                    context: "after the handshake completed",
                }
                .into())
            }
        }
    }

    fn resize(&self, session: SessionId, height: f64) -> Result<()> {
        if !height.is_finite() || height < 0.0 {
            return Err(ProtocolError::Malformed {
                event: rachis_protocol::EVENT_INNER_SIZE.to_string(),
                reason: format!("height must be a non-negative number, got {height}"),
            }
            .into());
        }
        let value = format!("{}px", height + self.margin_px);
        tracing::debug!(%session, height, style = %value, "resizing viewer container");
        self.container.set_height(&value);
        Ok(())
    }
}

//! In-process embedded frame.
//!
//! [`memory_frame`] returns the host-facing [`MemoryFrame`] and the
//! [`RemoteWindow`] standing in for the embedded document. The remote side
//! decides when loading finishes and may navigate away, which changes the
//! origin posted messages must target.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};

use crate::error::{Result, TransportError};
use crate::frame::{EmbeddedFrame, FrameAttributes};
use crate::origin::Origin;
use crate::port::Envelope;

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadState {
    Pending,
    Loaded,
    Failed(String),
}

/// A message as delivered to the embedded document.
#[derive(Debug)]
pub struct PostedMessage {
    pub envelope: Envelope,
    /// Target origin the host specified when posting.
    pub target_origin: Origin,
}

#[derive(Default)]
struct FrameState {
    attributes: Option<FrameAttributes>,
    document_origin: Option<Origin>,
    targets: Vec<Origin>,
    dropped: usize,
}

struct Shared {
    state: Mutex<FrameState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FrameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Host side of an in-process frame. Cheap to clone.
#[derive(Clone)]
pub struct MemoryFrame {
    shared: Arc<Shared>,
    inbox: mpsc::UnboundedSender<PostedMessage>,
    load: watch::Receiver<LoadState>,
}

/// Document side of an in-process frame.
pub struct RemoteWindow {
    shared: Arc<Shared>,
    load: watch::Sender<LoadState>,
    inbox: mpsc::UnboundedReceiver<PostedMessage>,
}

/// Create a connected frame / window pair.
pub fn memory_frame() -> (MemoryFrame, RemoteWindow) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (load_tx, load_rx) = watch::channel(LoadState::Pending);
    let shared = Arc::new(Shared {
        state: Mutex::new(FrameState::default()),
    });

    (
        MemoryFrame {
            shared: shared.clone(),
            inbox: tx,
            load: load_rx,
        },
        RemoteWindow {
            shared,
            load: load_tx,
            inbox: rx,
        },
    )
}

impl MemoryFrame {
    /// Attributes applied by the last `configure` call.
    pub fn attributes(&self) -> Option<FrameAttributes> {
        self.shared.lock().attributes.clone()
    }

    /// Target origin of every post, delivered or not, in order.
    pub fn posted_targets(&self) -> Vec<Origin> {
        self.shared.lock().targets.clone()
    }

    /// Number of posts dropped because the target origin did not match.
    pub fn dropped_count(&self) -> usize {
        self.shared.lock().dropped
    }
}

impl EmbeddedFrame for MemoryFrame {
    fn configure(&self, attributes: &FrameAttributes) -> Result<()> {
        let origin = attributes.origin()?;
        let mut state = self.shared.lock();
        state.attributes = Some(attributes.clone());
        state.document_origin = Some(origin);
        Ok(())
    }

    fn loaded(&self) -> impl Future<Output = Result<()>> + Send {
        let mut load = self.load.clone();
        async move {
            let state = load
                .wait_for(|state| *state != LoadState::Pending)
                .await
                .map_err(|_| TransportError::FrameDetached)?
                .clone();
            match state {
                LoadState::Failed(reason) => Err(TransportError::LoadFailed(reason)),
                _ => Ok(()),
            }
        }
    }

    fn post_message(&self, envelope: Envelope, target_origin: &Origin) -> Result<()> {
        let deliverable = {
            let mut state = self.shared.lock();
            state.targets.push(target_origin.clone());
            let matches = state.document_origin.as_ref() == Some(target_origin);
            if !matches {
                state.dropped += 1;
            }
            matches
        };

        if !deliverable {
            tracing::debug!(
                target_origin = %target_origin,
                "target origin does not match frame document, message dropped"
            );
            return Ok(());
        }

        self.inbox
            .send(PostedMessage {
                envelope,
                target_origin: target_origin.clone(),
            })
            .map_err(|_| TransportError::FrameDetached)
    }
}

impl RemoteWindow {
    /// Fire the load event.
    pub fn signal_loaded(&self) {
        let _ = self.load.send(LoadState::Loaded);
    }

    /// Report a load failure to anyone waiting on `loaded()`.
    pub fn fail_load(&self, reason: impl Into<String>) {
        let _ = self.load.send(LoadState::Failed(reason.into()));
    }

    /// Navigate the frame's document to another origin.
    pub fn navigate(&self, origin: Origin) {
        self.shared.lock().document_origin = Some(origin);
    }

    /// Current document origin, once the host has configured the frame.
    pub fn origin(&self) -> Option<Origin> {
        self.shared.lock().document_origin.clone()
    }

    /// Next delivered message. `None` once every host handle is dropped.
    pub async fn recv(&mut self) -> Option<PostedMessage> {
        self.inbox.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<PostedMessage> {
        self.inbox.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use url::Url;

    use super::*;

    fn viewer_url() -> Url {
        Url::parse("https://view.qiime2.org/").unwrap()
    }

    #[tokio::test]
    async fn configure_sets_document_origin() {
        let (frame, remote) = memory_frame();
        frame
            .configure(&FrameAttributes::fill(viewer_url()))
            .unwrap();

        assert_eq!(
            remote.origin(),
            Some(Origin::parse("https://view.qiime2.org").unwrap())
        );
        let attrs = frame.attributes().unwrap();
        assert_eq!(attrs.width, "100%");
        assert_eq!(attrs.height, "100%");
        assert_eq!(attrs.border, "none");
    }

    #[tokio::test]
    async fn loaded_resolves_after_signal() {
        let (frame, remote) = memory_frame();
        let waiter = tokio::spawn({
            let frame = frame.clone();
            async move { frame.loaded().await }
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        remote.signal_loaded();
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn load_failure_is_reported() {
        let (frame, remote) = memory_frame();
        remote.fail_load("404");
        assert_eq!(
            frame.loaded().await,
            Err(TransportError::LoadFailed("404".to_string()))
        );
    }

    #[tokio::test]
    async fn dropped_window_detaches_frame() {
        let (frame, remote) = memory_frame();
        drop(remote);
        assert_eq!(frame.loaded().await, Err(TransportError::FrameDetached));
    }

    #[tokio::test]
    async fn matching_origin_is_delivered() {
        let (frame, mut remote) = memory_frame();
        frame
            .configure(&FrameAttributes::fill(viewer_url()))
            .unwrap();
        let origin = Origin::from_url(&viewer_url()).unwrap();

        frame
            .post_message(Envelope::new(json!({"event": "ping"})), &origin)
            .unwrap();

        let posted = remote.try_recv().expect("message should be delivered");
        assert_eq!(posted.target_origin, origin);
        assert_eq!(posted.envelope.event_name(), Some("ping"));
    }

    #[tokio::test]
    async fn navigation_away_drops_messages() {
        let (frame, mut remote) = memory_frame();
        frame
            .configure(&FrameAttributes::fill(viewer_url()))
            .unwrap();
        let trusted = Origin::from_url(&viewer_url()).unwrap();

        remote.navigate(Origin::parse("https://evil.example").unwrap());
        frame
            .post_message(Envelope::new(json!({"event": "secret"})), &trusted)
            .unwrap();

        assert!(remote.try_recv().is_none());
        assert_eq!(frame.dropped_count(), 1);
        assert_eq!(frame.posted_targets(), vec![trusted]);
    }

    #[tokio::test]
    async fn window_inbox_closes_when_frame_handles_drop() {
        let (frame, mut remote) = memory_frame();
        let clone = frame.clone();
        drop(frame);
        drop(clone);
        assert!(remote.recv().await.is_none());
    }
}

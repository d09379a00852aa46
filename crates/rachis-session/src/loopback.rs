//! Simulated viewer for driving a session in-process.
//!
//! [`LoopbackViewer`] plays the embedded document's side of the protocol on a
//! [`RemoteWindow`]. It is what the `simulate` command runs against, and a
//! convenient peer for tests.

use bytes::Bytes;
use rachis_protocol::{HostMessage, RemoteMessage, RoundToken, SessionId};
use rachis_transport::{MessagePort, RemoteWindow};

/// How the simulated viewer behaves.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopbackBehavior {
    /// Proposals to drop before accepting one.
    pub ignore_proposals: usize,
    /// Never accept anything.
    pub silent: bool,
    /// Content height reported after the archive arrives. `None` reports nothing.
    pub content_height: Option<f64>,
}

impl Default for LoopbackBehavior {
    fn default() -> Self {
        Self {
            ignore_proposals: 0,
            silent: false,
            content_height: Some(400.0),
        }
    }
}

/// What the viewer observed by the time it stopped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopbackReport {
    /// Proposals received, including ignored ones.
    pub proposals_seen: usize,
    /// The round the viewer accepted and readied.
    pub accepted_round: Option<RoundToken>,
    /// Archive bytes received on the negotiated channel.
    pub archive: Option<Bytes>,
}

pub struct LoopbackViewer {
    window: RemoteWindow,
    behavior: LoopbackBehavior,
}

impl LoopbackViewer {
    pub fn new(window: RemoteWindow, behavior: LoopbackBehavior) -> Self {
        Self { window, behavior }
    }

    /// Serve the host until the frame or the negotiated channel closes.
    pub async fn run(mut self) -> LoopbackReport {
        let mut report = LoopbackReport::default();
        self.window.signal_loaded();

        let Some((session, port)) = self.handshake(&mut report).await else {
            tracing::debug!(
                proposals = report.proposals_seen,
                "frame closed before a channel was negotiated"
            );
            return report;
        };
        serve(session, port, &self.behavior, &mut report).await;
        report
    }

    async fn handshake(
        &mut self,
        report: &mut LoopbackReport,
    ) -> Option<(SessionId, MessagePort)> {
        loop {
            let posted = self.window.recv().await?;
            let (id, session, mut port) = match HostMessage::from_envelope(posted.envelope) {
                Ok(HostMessage::Propose { id, session, port }) => (id, session, port),
                Ok(other) => {
                    tracing::warn!(
                        event = other.event(),
                        "viewer ignoring non-proposal on the window"
                    );
                    continue;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "viewer ignoring undecodable window message");
                    continue;
                }
            };
            report.proposals_seen += 1;

            if self.behavior.silent || report.proposals_seen <= self.behavior.ignore_proposals {
                tracing::trace!(round = %id, "viewer ignoring proposal");
                continue;
            }

            let accept = RemoteMessage::Accept { session }.into_envelope().ok()?;
            if port.post(accept).is_err() {
                continue;
            }
            tracing::debug!(round = %id, "viewer accepted round");

            let confirmed = match port.recv().await {
                Some(envelope) => matches!(
                    HostMessage::from_envelope(envelope),
                    Ok(HostMessage::Confirm { id: got, .. }) if got == id
                ),
                None => false,
            };
            if !confirmed {
                tracing::debug!(round = %id, "round was not confirmed");
                continue;
            }

            let ready = RemoteMessage::Ready { session }.into_envelope().ok()?;
            port.post(ready).ok()?;
            report.accepted_round = Some(id);
            return Some((session, port));
        }
    }
}

async fn serve(
    session: SessionId,
    mut port: MessagePort,
    behavior: &LoopbackBehavior,
    report: &mut LoopbackReport,
) {
    while let Some(envelope) = port.recv().await {
        match HostMessage::from_envelope(envelope) {
            Ok(HostMessage::BlobArchive { blob }) => {
                tracing::info!(%session, bytes = blob.len(), "viewer received archive");
                report.archive = Some(blob);
                if let Some(height) = behavior.content_height {
                    let Ok(size) = (RemoteMessage::InnerSize { height }).into_envelope() else {
                        continue;
                    };
                    if port.post(size).is_err() {
                        break;
                    }
                }
            }
            Ok(other) => {
                tracing::warn!(%session, event = other.event(), "viewer got unexpected message");
            }
            Err(err) => {
                tracing::warn!(%session, error = %err, "viewer got undecodable message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rachis_protocol::encode_archive;
    use rachis_transport::memory_frame;

    use super::*;
    use crate::config::SessionConfig;
    use crate::container::MemoryContainer;
    use crate::error::{NegotiationError, SessionError};
    use crate::session::{ArchiveSession, Delivery};

    async fn wait_for_height(container: &MemoryContainer) -> Option<String> {
        for _ in 0..200 {
            if let Some(height) = container.height() {
                return Some(height);
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        None
    }

    #[tokio::test]
    async fn full_session_after_ignored_proposals() {
        let (frame, window) = memory_frame();
        let viewer = tokio::spawn(
            LoopbackViewer::new(
                window,
                LoopbackBehavior {
                    ignore_proposals: 4,
                    ..LoopbackBehavior::default()
                },
            )
            .run(),
        );
        let container = MemoryContainer::new();
        let session = ArchiveSession::open(frame, container.clone(), &SessionConfig::default())
            .unwrap();

        let payload = encode_archive(b"PK\x03\x04loopback");
        assert_eq!(
            session.deliver(&payload).await.unwrap(),
            Delivery::Sent { bytes: 12 }
        );
        assert_eq!(wait_for_height(&container).await.as_deref(), Some("450px"));
        drop(session);

        let report = viewer.await.unwrap();
        assert!(report.proposals_seen >= 5, "{report:?}");
        assert!(report.accepted_round.is_some());
        assert_eq!(report.archive.as_deref(), Some(&b"PK\x03\x04loopback"[..]));
    }

    #[tokio::test]
    async fn no_height_report_leaves_container_alone() {
        let (frame, window) = memory_frame();
        let viewer = tokio::spawn(
            LoopbackViewer::new(
                window,
                LoopbackBehavior {
                    content_height: None,
                    ..LoopbackBehavior::default()
                },
            )
            .run(),
        );
        let container = MemoryContainer::new();
        let session = ArchiveSession::open(frame, container.clone(), &SessionConfig::default())
            .unwrap();

        session.deliver(&encode_archive(b"x")).await.unwrap();
        drop(session);
        let report = viewer.await.unwrap();
        assert_eq!(report.archive.as_deref(), Some(&b"x"[..]));
        assert_eq!(container.height(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_viewer_times_out() {
        let (frame, window) = memory_frame();
        let viewer = tokio::spawn(
            LoopbackViewer::new(
                window,
                LoopbackBehavior {
                    silent: true,
                    ..LoopbackBehavior::default()
                },
            )
            .run(),
        );
        let session = ArchiveSession::open(frame, MemoryContainer::new(), &SessionConfig::default())
            .unwrap();

        let err = session.deliver(&encode_archive(b"x")).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Negotiation(NegotiationError::Timeout { proposals: 200, .. })
        ));
        drop(session);

        let report = viewer.await.unwrap();
        assert_eq!(report.proposals_seen, 200);
        assert_eq!(report.accepted_round, None);
        assert_eq!(report.archive, None);
    }
}

//! Viewer channel negotiation.
//!
//! A port transferred to the frame may be serviced in any order relative to
//! other ports in flight, so a single request/response cannot tell which
//! offer the viewer picked up. Negotiation therefore runs four phases:
//!
//! 1. wait for the frame's document to load;
//! 2. propose a fresh port every interval (`SESSION_PROPOSE`);
//! 3. on the first `SESSION_ACCEPT`, stop proposing and confirm that round
//!    (`SESSION_CONFIRM`);
//! 4. on `SESSION_READY` from the confirmed round, that port is the channel.
//!
//! Every timer and listener of an attempt hangs off one cancellation token,
//! which is cancelled however the attempt ends.

use std::collections::HashMap;
use std::fmt;

use rachis_protocol::{HostMessage, ProtocolError, RemoteMessage, RoundToken, SessionId};
use rachis_transport::{EmbeddedFrame, MessageChannel, MessagePort, PortReceiver, PortSender};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::NegotiatorConfig;
use crate::error::NegotiationError;

type Result<T> = std::result::Result<T, NegotiationError>;

type Reply = (RoundToken, std::result::Result<RemoteMessage, ProtocolError>);

/// The port selected by a successful negotiation.
#[derive(Debug)]
pub struct NegotiatedChannel {
    session: SessionId,
    round: RoundToken,
    port: MessagePort,
}

impl NegotiatedChannel {
    /// Session identity the handshake ran under.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// The winning proposal round.
    pub fn round(&self) -> RoundToken {
        self.round
    }

    pub fn port_mut(&mut self) -> &mut MessagePort {
        &mut self.port
    }

    pub fn into_port(self) -> MessagePort {
        self.port
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundState {
    Proposed,
    Confirmed,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundState::Proposed => f.write_str("proposed"),
            RoundState::Confirmed => f.write_str("confirmed"),
        }
    }
}

struct Round {
    sender: PortSender,
    listener: JoinHandle<PortReceiver>,
    state: RoundState,
}

/// Single-use negotiation state, keyed by round token.
struct Attempt<'a> {
    config: &'a NegotiatorConfig,
    session: SessionId,
    cancel: CancellationToken,
    replies: mpsc::UnboundedSender<Reply>,
    rounds: HashMap<RoundToken, Round>,
    confirmed: Option<RoundToken>,
    proposals: u32,
}

/// Negotiate a private channel with the document in `frame`.
///
/// Resolves with exactly one port whose peer accepted and confirmed ready.
/// Fails with [`NegotiationError::Timeout`] once `max_proposals` ticks pass
/// without that, or [`NegotiationError::ProtocolViolation`] on any reply the
/// handshake does not allow.
pub async fn negotiate<F: EmbeddedFrame>(
    frame: &F,
    config: &NegotiatorConfig,
) -> Result<NegotiatedChannel> {
    config.validate()?;
    frame.loaded().await?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let (replies, mut reply_rx) = mpsc::unbounded_channel();

    let mut attempt = Attempt {
        config,
        session: SessionId::random(),
        cancel,
        replies,
        rounds: HashMap::new(),
        confirmed: None,
        proposals: 0,
    };

    tracing::debug!(
        session = %attempt.session,
        origin = %config.trusted_origin,
        "negotiating viewer channel"
    );

    let mut ticker = tokio::time::interval(config.proposal_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            biased;
            Some((token, reply)) = reply_rx.recv() => {
                if let Some(channel) = attempt.on_reply(token, reply).await? {
                    return Ok(channel);
                }
            }
            _ = ticker.tick() => {
                if ticks >= config.max_proposals {
                    tracing::warn!(
                        session = %attempt.session,
                        proposals = attempt.proposals,
                        "viewer did not respond"
                    );
                    return Err(NegotiationError::Timeout {
                        remote: config.trusted_origin.to_string(),
                        proposals: attempt.proposals,
                    });
                }
                ticks += 1;
                if attempt.confirmed.is_none() {
                    attempt.propose(frame)?;
                }
            }
        }
    }
}

impl Attempt<'_> {
    fn propose<F: EmbeddedFrame>(&mut self, frame: &F) -> Result<()> {
        let token = RoundToken::random();
        let (local, remote) = MessageChannel::new().into_ports();
        let (sender, receiver) = local.split();

        let listener = tokio::spawn(listen(
            token,
            receiver,
            self.replies.clone(),
            self.cancel.clone(),
        ));
        self.rounds.insert(
            token,
            Round {
                sender,
                listener,
                state: RoundState::Proposed,
            },
        );

        let envelope = HostMessage::Propose {
            id: token,
            session: self.session,
            port: remote,
        }
        .into_envelope()?;
        frame.post_message(envelope, &self.config.trusted_origin)?;
        self.proposals += 1;

        tracing::trace!(
            session = %self.session,
            round = %token,
            attempt = self.proposals,
            "proposed round"
        );
        Ok(())
    }

    async fn on_reply(
        &mut self,
        token: RoundToken,
        reply: std::result::Result<RemoteMessage, ProtocolError>,
    ) -> Result<Option<NegotiatedChannel>> {
        let message = reply.map_err(|err| self.violation(format!("round {token}: {err}")))?;
        let Some(state) = self.rounds.get(&token).map(|round| round.state) else {
            return Err(self.violation(format!("reply on unknown round {token}")));
        };

        match (state, message) {
            (RoundState::Proposed, RemoteMessage::Accept { session }) => {
                self.check_session(session)?;
                if let Some(winner) = self.confirmed {
                    tracing::debug!(
                        session = %self.session,
                        round = %token,
                        confirmed = %winner,
                        "ignoring accept for a losing round"
                    );
                    return Ok(None);
                }
                self.confirm(token)?;
                Ok(None)
            }
            (RoundState::Confirmed, RemoteMessage::Ready { session }) => {
                self.check_session(session)?;
                self.finish(token).await.map(Some)
            }
            (state, other) => Err(self.violation(format!(
                "unexpected {} on {state} round {token}",
                other.event()
            ))),
        }
    }

    fn confirm(&mut self, token: RoundToken) -> Result<()> {
        let Some(round) = self.rounds.get_mut(&token) else {
            return Err(self.violation(format!("confirm for unknown round {token}")));
        };
        let envelope = HostMessage::Confirm {
            id: token,
            session: self.session,
        }
        .into_envelope()?;
        round.sender.post(envelope)?;
        round.state = RoundState::Confirmed;
        self.confirmed = Some(token);

        tracing::debug!(
            session = %self.session,
            round = %token,
            proposals = self.proposals,
            "viewer accepted round, confirming"
        );
        Ok(())
    }

    async fn finish(&mut self, token: RoundToken) -> Result<NegotiatedChannel> {
        self.cancel.cancel();
        let Some(round) = self.rounds.remove(&token) else {
            return Err(self.violation(format!("ready for unknown round {token}")));
        };
        let receiver = round
            .listener
            .await
            .map_err(|err| NegotiationError::Listener(err.to_string()))?;
        let port = MessagePort::reunite(round.sender, receiver)?;

        tracing::info!(
            session = %self.session,
            round = %token,
            proposals = self.proposals,
            discarded = self.rounds.len(),
            "viewer channel negotiated"
        );
        // Losing rounds are dropped with `self`; their listeners already
        // observed the cancellation.
        Ok(NegotiatedChannel {
            session: self.session,
            round: token,
            port,
        })
    }

    fn check_session(&self, session: SessionId) -> Result<()> {
        if session != self.session {
            return Err(self.violation(format!(
                "reply for session {session}, expected {}",
                self.session
            )));
        }
        Ok(())
    }

    fn violation(&self, reason: String) -> NegotiationError {
        tracing::warn!(session = %self.session, %reason, "handshake protocol violation");
        NegotiationError::ProtocolViolation {
            remote: self.config.trusted_origin.to_string(),
            reason,
        }
    }
}

/// Forward every reply on one round port until cancelled.
///
/// Stops reading right after a ready reply so anything the viewer sends
/// next stays queued for the session.
async fn listen(
    token: RoundToken,
    mut receiver: PortReceiver,
    replies: mpsc::UnboundedSender<Reply>,
    cancel: CancellationToken,
) -> PortReceiver {
    loop {
        let envelope = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            envelope = receiver.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
        };

        let reply = RemoteMessage::from_envelope(&envelope);
        let ready = matches!(reply, Ok(RemoteMessage::Ready { .. }));
        if replies.send((token, reply)).is_err() || ready {
            break;
        }
    }
    receiver
}

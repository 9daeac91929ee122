use crate::error::SessionError;
use crate::media::{TrackDistributor, TrackSet};
use crate::partner::{
    NegotiationRole, NegotiationState, PartnerCommand, PartnerEvent, PartnerHandle,
    PartnerSnapshot,
};
use crate::session::{SessionEvent, SessionNotifier};
use crate::signaling::SignalingChannel;
use crate::transport::{PeerTransport, TransportEvent, TransportFactory};
use meshcall_core::codec;
use meshcall_core::{IceCandidate, PartnerId, RoomId, SdpKind, SessionDescription, SignalMessage};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A fresh worker is handed its tracks, an offer or the remote offer, and
/// a greeting before it gets to run.
const MIN_INBOX_CAPACITY: usize = 4;

/// Everything a partner worker needs from its session.
#[derive(Clone)]
pub struct PartnerContext {
    pub local: PartnerId,
    pub room: RoomId,
    pub signaling: Arc<dyn SignalingChannel>,
    pub notifier: SessionNotifier,
    pub factory: Arc<dyn TransportFactory>,
    pub events: mpsc::UnboundedSender<PartnerEvent>,
    pub inbox_capacity: usize,
}

/// Negotiation state machine for one partner, run as its own task.
pub struct PartnerConnection {
    partner: PartnerId,
    generation: u64,
    ctx: Arc<PartnerContext>,
    status: watch::Sender<PartnerSnapshot>,
    transport: Box<dyn PeerTransport>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    pending_candidates: Vec<IceCandidate>,
    remote_set: bool,
    tracks: TrackSet,
    inbox: mpsc::Receiver<PartnerCommand>,
    cancel: CancellationToken,
}

impl PartnerConnection {
    /// Start the worker for a freshly opened transport.
    pub fn spawn(
        partner: PartnerId,
        generation: u64,
        ctx: Arc<PartnerContext>,
        transport: Box<dyn PeerTransport>,
        transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> PartnerHandle {
        let (sender, inbox) = mpsc::channel(ctx.inbox_capacity.max(MIN_INBOX_CAPACITY));
        let (status, status_rx) = watch::channel(PartnerSnapshot::idle(partner));
        let cancel = CancellationToken::new();

        let connection = Self {
            partner,
            generation,
            ctx,
            status,
            transport,
            transport_rx,
            pending_candidates: Vec::new(),
            remote_set: false,
            tracks: TrackSet::default(),
            inbox,
            cancel: cancel.clone(),
        };

        let task = tokio::spawn(connection.run());
        PartnerHandle::new(partner, generation, sender, status_rx, cancel, task)
    }

    async fn run(mut self) {
        debug!(
            "Worker for partner {} (generation {}) started",
            self.partner, self.generation
        );

        loop {
            let result = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                cmd = self.inbox.recv() => match cmd {
                    Some(c) => self.handle_command(c).await,
                    None => break,
                },

                Some(evt) = self.transport_rx.recv() => self.handle_transport_event(evt).await,
            };

            if let Err(err) = result {
                self.report(err);
                break;
            }
        }

        self.shutdown().await;
    }

    async fn handle_command(&mut self, cmd: PartnerCommand) -> Result<(), SessionError> {
        if self.state().is_closed() {
            debug!("Dropped {} for closed partner {}", cmd.label(), self.partner);
            return Ok(());
        }

        match cmd {
            PartnerCommand::CreateOffer => self.create_offer().await,
            PartnerCommand::Remote(desc) => match desc.kind {
                SdpKind::Offer => self.handle_offer(desc).await,
                SdpKind::Answer => self.handle_answer(desc).await,
            },
            PartnerCommand::Ice(candidate) => self.handle_candidate(candidate).await,
            PartnerCommand::SyncTracks { tracks, initial } => {
                self.apply_tracks(tracks, initial).await
            }
            PartnerCommand::Extension { tag, payload } => {
                self.ctx.notifier.notify(SessionEvent::Extension {
                    partner: self.partner,
                    tag,
                    payload,
                });
                Ok(())
            }
            PartnerCommand::Send(msg) => {
                self.send(&msg).await;
                Ok(())
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) -> Result<(), SessionError> {
        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                self.send(&SignalMessage::IceCandidate(candidate)).await;
                Ok(())
            }
            TransportEvent::RemoteTrack(track) => {
                info!(
                    "Partner {} is sending {} track '{}'",
                    self.partner, track.kind, track.track_id
                );
                self.ctx
                    .notifier
                    .notify(SessionEvent::RemoteTrack(self.partner, track));
                Ok(())
            }
            TransportEvent::Failed(reason) => Err(SessionError::Negotiation {
                partner: self.partner,
                reason,
            }),
        }
    }

    async fn create_offer(&mut self) -> Result<(), SessionError> {
        let state = self.state();
        if state != NegotiationState::Idle {
            debug!(
                "Partner {} is {}, not starting another offer",
                self.partner, state
            );
            return Ok(());
        }

        let offer = self.guard(self.transport.create_offer()).await?;
        self.guard(self.transport.set_local_description(offer.clone()))
            .await?;
        self.ensure_live()?;

        self.set_status(NegotiationState::OfferSent, Some(NegotiationRole::Caller));
        info!("Sending offer to partner {}", self.partner);
        self.send(&SignalMessage::SessionDescription(offer)).await;
        Ok(())
    }

    async fn handle_offer(&mut self, offer: SessionDescription) -> Result<(), SessionError> {
        if self.state() == NegotiationState::OfferSent {
            if !self.ctx.local.is_polite_towards(&self.partner) {
                info!(
                    "Offer collision with partner {}: keeping our own offer",
                    self.partner
                );
                return Ok(());
            }

            info!(
                "Offer collision with partner {}: yielding to their offer",
                self.partner
            );
            self.renew_transport().await?;
        }

        self.accept_offer(offer).await
    }

    /// set-remote, replay candidates, create answer, set-local, send.
    /// Runs to completion before the next command is looked at.
    async fn accept_offer(&mut self, offer: SessionDescription) -> Result<(), SessionError> {
        let was_connected = self.state() == NegotiationState::Connected;
        let role = self.role().unwrap_or(NegotiationRole::Callee);
        self.set_status(NegotiationState::AnswerPending, Some(role));

        self.guard(self.transport.set_remote_description(offer))
            .await?;
        self.remote_set = true;
        self.flush_candidates().await?;

        let answer = self.guard(self.transport.create_answer()).await?;
        self.guard(self.transport.set_local_description(answer.clone()))
            .await?;
        self.ensure_live()?;

        info!("Sending answer to partner {}", self.partner);
        self.send(&SignalMessage::SessionDescription(answer)).await;
        self.set_status(NegotiationState::Connected, Some(role));

        if !was_connected {
            self.ctx
                .notifier
                .notify(SessionEvent::PartnerConnected(self.partner));
        }
        Ok(())
    }

    async fn handle_answer(&mut self, answer: SessionDescription) -> Result<(), SessionError> {
        let state = self.state();
        if state != NegotiationState::OfferSent {
            warn!(
                "Ignoring answer from partner {} while {}",
                self.partner, state
            );
            return Ok(());
        }

        self.guard(self.transport.set_remote_description(answer))
            .await?;
        self.remote_set = true;
        self.flush_candidates().await?;

        self.set_status(NegotiationState::Connected, self.role());
        info!("Connected to partner {}", self.partner);
        self.ctx
            .notifier
            .notify(SessionEvent::PartnerConnected(self.partner));
        Ok(())
    }

    async fn handle_candidate(&mut self, candidate: IceCandidate) -> Result<(), SessionError> {
        if !self.remote_set {
            debug!(
                "Buffering ICE candidate from partner {} until the remote description arrives",
                self.partner
            );
            self.pending_candidates.push(candidate);
            return Ok(());
        }

        self.add_candidate(candidate).await
    }

    async fn flush_candidates(&mut self) -> Result<(), SessionError> {
        let pending = std::mem::take(&mut self.pending_candidates);
        if !pending.is_empty() {
            debug!(
                "Applying {} buffered ICE candidate(s) from partner {}",
                pending.len(),
                self.partner
            );
        }

        for candidate in pending {
            self.add_candidate(candidate).await?;
        }
        Ok(())
    }

    /// A rejected candidate is not fatal, other paths may still work.
    async fn add_candidate(&mut self, candidate: IceCandidate) -> Result<(), SessionError> {
        match self.guard(self.transport.add_ice_candidate(candidate)).await {
            Ok(()) => Ok(()),
            Err(SessionError::Cancelled(partner)) => Err(SessionError::Cancelled(partner)),
            Err(e) => {
                warn!("{}", e);
                Ok(())
            }
        }
    }

    async fn apply_tracks(&mut self, tracks: TrackSet, initial: bool) -> Result<(), SessionError> {
        let report = self
            .guard(TrackDistributor::apply(&*self.transport, &tracks, initial))
            .await;
        self.tracks = tracks;

        match report {
            Ok(report) => {
                debug!(
                    "Tracks for partner {}: {} replaced, {} added",
                    self.partner, report.replaced, report.added
                );
                if report.added > 0 && self.state() == NegotiationState::Connected {
                    debug!(
                        "New sender on established link to partner {} waits for the next negotiation",
                        self.partner
                    );
                }
                Ok(())
            }
            Err(SessionError::Cancelled(partner)) => Err(SessionError::Cancelled(partner)),
            Err(e) => {
                warn!("Track sync failed: {}", e);
                Ok(())
            }
        }
    }

    /// Drop the pending local offer by starting over on a fresh transport.
    async fn renew_transport(&mut self) -> Result<(), SessionError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let fresh = self
            .guard(self.ctx.factory.open(self.partner, events_tx))
            .await?;

        let stale = std::mem::replace(&mut self.transport, fresh);
        self.transport_rx = events_rx;
        if let Err(e) = stale.close().await {
            warn!(
                "Failed to close superseded transport for partner {}: {:#}",
                self.partner, e
            );
        }

        self.remote_set = false;
        self.set_status(NegotiationState::Idle, None);

        let tracks = self.tracks.clone();
        self.guard(TrackDistributor::apply(&*self.transport, &tracks, true))
            .await?;
        Ok(())
    }

    async fn send(&self, msg: &SignalMessage) {
        let payload = match codec::encode(msg) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to encode {} for partner {}: {}", msg.label(), self.partner, e);
                return;
            }
        };

        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Dropped {} for cancelled partner {}", msg.label(), self.partner);
                return;
            }
            res = self
                .ctx
                .signaling
                .send(&self.ctx.room, self.ctx.local, Some(self.partner), payload) => res,
        };

        if let Err(e) = sent {
            warn!(
                "Failed to send {} to partner {}: {:#}",
                msg.label(),
                self.partner,
                e
            );
        }
    }

    /// Run a transport step unless the connection is cancelled first.
    async fn guard<T>(
        &self,
        step: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, SessionError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled(self.partner)),
            res = step => res.map_err(|e| SessionError::negotiation(self.partner, e)),
        }
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled(self.partner));
        }
        Ok(())
    }

    fn report(&self, err: SessionError) {
        if let SessionError::Cancelled(_) = err {
            debug!("Negotiation with partner {} cancelled", self.partner);
            return;
        }

        warn!("Closing connection to partner {}: {}", self.partner, err);
        let _ = self.ctx.events.send(PartnerEvent::Failed {
            partner: self.partner,
            generation: self.generation,
            reason: err.to_string(),
        });
    }

    async fn shutdown(&mut self) {
        self.set_status(NegotiationState::Closed, self.role());
        self.pending_candidates.clear();
        self.inbox.close();

        if let Err(e) = self.transport.close().await {
            warn!(
                "Failed to close transport for partner {}: {:#}",
                self.partner, e
            );
        }
        info!("Connection to partner {} closed", self.partner);
    }

    fn state(&self) -> NegotiationState {
        self.status.borrow().state
    }

    fn role(&self) -> Option<NegotiationRole> {
        self.status.borrow().role
    }

    fn set_status(&self, state: NegotiationState, role: Option<NegotiationRole>) {
        self.status.send_modify(|s| {
            s.state = state;
            s.role = role;
        });
    }
}

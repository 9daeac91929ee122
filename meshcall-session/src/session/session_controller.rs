use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::{LocalMedia, MediaConstraints, MediaDevices, MediaSource, TrackDistributor};
use crate::partner::{PartnerCommand, PartnerContext, PartnerEvent, PartnerRegistry};
use crate::session::{SessionCommand, SessionEvent, SessionNotifier, SessionObserver};
use crate::signaling::{InboundSignal, SignalingChannel};
use crate::transport::TransportFactory;
use meshcall_core::utils::USERINFO_TAG;
use meshcall_core::{PartnerId, RoomId, SdpKind, SignalMessage, codec};
use serde_json::{Value, json};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

struct Joined {
    local: PartnerId,
    room: RoomId,
    registry: PartnerRegistry,
    media: LocalMedia,
}

/// Session actor: owns the registry and local media, and is the only
/// place either is mutated.
pub struct SessionController {
    config: SessionConfig,
    devices: Arc<dyn MediaDevices>,
    signaling: Arc<dyn SignalingChannel>,
    notifier: SessionNotifier,
    factory: Arc<dyn TransportFactory>,
    joined: Option<Joined>,
    command_rx: mpsc::Receiver<SessionCommand>,
    inbound_tx: mpsc::UnboundedSender<InboundSignal>,
    inbound_rx: mpsc::UnboundedReceiver<InboundSignal>,
    events_tx: mpsc::UnboundedSender<PartnerEvent>,
    events_rx: mpsc::UnboundedReceiver<PartnerEvent>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        devices: Arc<dyn MediaDevices>,
        signaling: Arc<dyn SignalingChannel>,
        observer: Arc<dyn SessionObserver>,
        factory: Arc<dyn TransportFactory>,
        command_rx: mpsc::Receiver<SessionCommand>,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            config,
            devices,
            signaling,
            notifier: SessionNotifier::spawn(observer),
            factory,
            joined: None,
            command_rx,
            inbound_tx,
            inbound_rx,
            events_tx,
            events_rx,
        }
    }

    pub async fn run(mut self) {
        info!("Session event loop started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => {
                            if self.handle_command(c).await.is_break() {
                                break;
                            }
                        }
                        None => {
                            info!("All session handles dropped. Hanging up.");
                            self.leave().await;
                            break;
                        }
                    }
                }

                Some(signal) = self.inbound_rx.recv() => {
                    if let Err(e) = self.dispatch(signal).await {
                        if e.is_partner_scoped() {
                            debug!("{}", e);
                        } else {
                            warn!("Dropped inbound signal: {}", e);
                        }
                    }
                }

                Some(evt) = self.events_rx.recv() => self.handle_partner_event(evt).await,
            }
        }

        info!("Session event loop finished");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> ControlFlow<()> {
        match cmd {
            SessionCommand::JoinRoom { room, local, reply } => {
                let _ = reply.send(self.join_room(room, local).await);
            }
            SessionCommand::CallAll { reply } => {
                let _ = reply.send(self.call_all().await);
            }
            SessionCommand::Call { partner, reply } => {
                let _ = reply.send(self.call(partner).await);
            }
            SessionCommand::SwitchMediaSource { source, reply } => {
                let _ = reply.send(self.switch_media_source(source).await);
            }
            SessionCommand::ChangeDevices { constraints, reply } => {
                let _ = reply.send(self.change_devices(constraints).await);
            }
            SessionCommand::Broadcast {
                tag,
                payload,
                reply,
            } => {
                let _ = reply.send(self.broadcast(tag, payload).await);
            }
            SessionCommand::HangUp { reply } => {
                self.leave().await;
                let _ = reply.send(Ok(()));
                return ControlFlow::Break(());
            }
            SessionCommand::Partners { reply } => {
                let snapshots = self
                    .joined
                    .as_ref()
                    .map(|j| j.registry.snapshots())
                    .unwrap_or_default();
                let _ = reply.send(Ok(snapshots));
            }
            SessionCommand::LocalMediaSource { reply } => {
                let source = self
                    .joined
                    .as_ref()
                    .map(|j| j.media.source())
                    .ok_or(SessionError::NotJoined);
                let _ = reply.send(source);
            }
        }
        ControlFlow::Continue(())
    }

    async fn join_room(&mut self, room: RoomId, local: PartnerId) -> Result<(), SessionError> {
        if let Some(joined) = &self.joined {
            return Err(SessionError::AlreadyJoined(joined.room.to_string()));
        }

        let camera = match self
            .devices
            .acquire_local_media(&self.config.media_constraints)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to acquire local media: {}", e);
                self.notifier.notify(SessionEvent::MediaError(e.clone()));
                return Err(e.into());
            }
        };

        self.signaling
            .join(&room, local, self.inbound_tx.clone())
            .await
            .map_err(|e| SessionError::Signaling(format!("{e:#}")))?;

        let registry = PartnerRegistry::new(PartnerContext {
            local,
            room: room.clone(),
            signaling: self.signaling.clone(),
            notifier: self.notifier.clone(),
            factory: self.factory.clone(),
            events: self.events_tx.clone(),
            inbox_capacity: self.config.partner_inbox_capacity,
        });

        info!("Joined room '{}' as {}", room, local);
        self.joined = Some(Joined {
            local,
            room,
            registry,
            media: LocalMedia::new(camera),
        });

        self.call_all().await
    }

    async fn call_all(&mut self) -> Result<(), SessionError> {
        let joined = self.joined.as_ref().ok_or(SessionError::NotJoined)?;
        self.announce(joined, None, &SignalMessage::Call(joined.local))
            .await
    }

    async fn call(&mut self, partner: PartnerId) -> Result<(), SessionError> {
        let joined = self.joined.as_mut().ok_or(SessionError::NotJoined)?;
        if partner == joined.local {
            debug!("Not calling ourselves");
            return Ok(());
        }

        let tracks = joined.media.track_set();
        joined.registry.add_or_replace(partner, &tracks).await?;
        self.notifier.notify(SessionEvent::PartnerJoined(partner));
        self.greet(partner);
        Ok(())
    }

    async fn switch_media_source(&mut self, source: MediaSource) -> Result<usize, SessionError> {
        let joined = self.joined.as_mut().ok_or(SessionError::NotJoined)?;
        if joined.media.source() == source {
            return Ok(0);
        }

        match source {
            MediaSource::Screen => {
                let screen = match self.devices.acquire_display_media().await {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!("Screen sharing unavailable: {}", e);
                        self.notifier.notify(SessionEvent::MediaError(e.clone()));
                        return Err(e.into());
                    }
                };
                joined.media.show_screen(screen);
            }
            MediaSource::Camera => {
                if let Some(screen) = joined.media.show_camera() {
                    debug!("Released screen stream {}", screen.id);
                }
            }
        }

        info!("Local media source is now {:?}", source);
        Ok(TrackDistributor::sync_all(&joined.registry, &joined.media))
    }

    async fn change_devices(&mut self, constraints: MediaConstraints) -> Result<usize, SessionError> {
        let joined = self.joined.as_mut().ok_or(SessionError::NotJoined)?;

        let camera = match self.devices.acquire_local_media(&constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to switch devices: {}", e);
                self.notifier.notify(SessionEvent::MediaError(e.clone()));
                return Err(e.into());
            }
        };

        let old = joined.media.replace_camera(camera);
        debug!("Replaced camera stream {}", old.id);
        self.config.media_constraints = constraints;
        Ok(TrackDistributor::sync_all(&joined.registry, &joined.media))
    }

    async fn broadcast(&mut self, tag: String, payload: Value) -> Result<usize, SessionError> {
        let joined = self.joined.as_ref().ok_or(SessionError::NotJoined)?;
        let msg = SignalMessage::extension(tag, payload);

        Ok(joined
            .registry
            .for_each(|_| PartnerCommand::Send(msg.clone())))
    }

    /// Tell the room we are going, then release every connection.
    async fn leave(&mut self) {
        let Some(mut joined) = self.joined.take() else {
            return;
        };

        if let Err(e) = self
            .announce(&joined, None, &SignalMessage::Closing(joined.local))
            .await
        {
            warn!("Failed to announce departure: {}", e);
        }

        joined.registry.close_all().await;
        if let Err(e) = self.signaling.close().await {
            warn!("Failed to close signaling channel: {:#}", e);
        }
        info!("Left room '{}'", joined.room);
    }

    async fn dispatch(&mut self, signal: InboundSignal) -> Result<(), SessionError> {
        let Some(joined) = self.joined.as_mut() else {
            debug!("Signal from {} before joining a room", signal.from);
            return Ok(());
        };
        if signal.room != joined.room {
            debug!(
                "Signal from {} for room '{}' dropped (we are in '{}')",
                signal.from, signal.room, joined.room
            );
            return Ok(());
        }
        if signal.from == joined.local {
            return Ok(());
        }

        let sender = signal.from;
        let msg = codec::decode(&signal.payload)?;
        debug!("Received {} from partner {}", msg.label(), sender);

        match msg {
            SignalMessage::Call(id) => {
                if id != sender {
                    debug!("Call from {} names {}; using the sender", sender, id);
                }
                let tracks = joined.media.track_set();
                joined.registry.add_or_replace(sender, &tracks).await?;
                self.notifier.notify(SessionEvent::PartnerJoined(sender));
                self.greet(sender);
            }

            SignalMessage::SessionDescription(desc)
                if desc.kind == SdpKind::Offer && !joined.registry.contains(sender) =>
            {
                let tracks = joined.media.track_set();
                let handle = joined.registry.open(sender, &tracks).await?;
                // Joined has to be queued before the worker can report Connected.
                self.notifier.notify(SessionEvent::PartnerJoined(sender));
                handle.send(PartnerCommand::Remote(desc))?;
                self.greet(sender);
            }

            SignalMessage::Closing(_) => {
                if joined.registry.remove(sender).await {
                    info!("Partner {} left", sender);
                    self.notifier.notify(SessionEvent::PartnerLeft(sender));
                }
            }

            other => {
                let Some(handle) = joined.registry.lookup(sender) else {
                    return Err(SessionError::StaleMessage(sender));
                };

                let command = match other {
                    SignalMessage::SessionDescription(desc) => PartnerCommand::Remote(desc),
                    SignalMessage::IceCandidate(candidate) => PartnerCommand::Ice(candidate),
                    SignalMessage::Extension { tag, payload } => {
                        PartnerCommand::Extension { tag, payload }
                    }
                    SignalMessage::Call(_) | SignalMessage::Closing(_) => return Ok(()),
                };
                handle.send(command)?;
            }
        }

        Ok(())
    }

    async fn handle_partner_event(&mut self, event: PartnerEvent) {
        match event {
            PartnerEvent::Failed {
                partner,
                generation,
                reason,
            } => {
                let Some(joined) = self.joined.as_mut() else {
                    return;
                };
                if joined.registry.remove_generation(partner, generation).await {
                    warn!("Dropped partner {} after failure: {}", partner, reason);
                    self.notifier.notify(SessionEvent::PartnerLeft(partner));
                }
            }
        }
    }

    /// Send the display name to a freshly created connection.
    fn greet(&self, partner: PartnerId) {
        let (Some(name), Some(joined)) = (&self.config.display_name, &self.joined) else {
            return;
        };
        let Some(handle) = joined.registry.lookup(partner) else {
            return;
        };

        let msg = SignalMessage::extension(USERINFO_TAG, json!({ "name": name }));
        if let Err(e) = handle.send(PartnerCommand::Send(msg)) {
            debug!("Greeting not delivered: {}", e);
        }
    }

    async fn announce(
        &self,
        joined: &Joined,
        to: Option<PartnerId>,
        msg: &SignalMessage,
    ) -> Result<(), SessionError> {
        let payload = codec::encode(msg)?;
        self.signaling
            .send(&joined.room, joined.local, to, payload)
            .await
            .map_err(|e| SessionError::Signaling(format!("{e:#}")))
    }
}

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::{MediaConstraints, MediaDevices, MediaSource};
use crate::partner::PartnerSnapshot;
use crate::session::{NoopObserver, Reply, SessionCommand, SessionController, SessionObserver};
use crate::signaling::SignalingChannel;
use crate::transport::{TransportFactory, WebRtcTransportFactory};
use meshcall_core::{PartnerId, RoomId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Cheap, cloneable handle to a running session.
#[derive(Clone)]
pub struct Session {
    commands: mpsc::Sender<SessionCommand>,
}

impl Session {
    pub fn builder(
        devices: Arc<dyn MediaDevices>,
        signaling: Arc<dyn SignalingChannel>,
    ) -> SessionBuilder {
        SessionBuilder {
            config: SessionConfig::default(),
            devices,
            signaling,
            observer: Arc::new(NoopObserver),
            factory: None,
        }
    }

    /// Acquire local media, join `room` as `local` and announce ourselves.
    pub async fn join_room(&self, room: RoomId, local: PartnerId) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::JoinRoom { room, local, reply })
            .await
    }

    pub async fn call_all(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::CallAll { reply }).await
    }

    pub async fn call(&self, partner: PartnerId) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Call { partner, reply })
            .await
    }

    /// Returns the number of connections that got the new tracks.
    pub async fn switch_media_source(&self, source: MediaSource) -> Result<usize, SessionError> {
        self.request(|reply| SessionCommand::SwitchMediaSource { source, reply })
            .await
    }

    pub async fn change_devices(
        &self,
        constraints: MediaConstraints,
    ) -> Result<usize, SessionError> {
        self.request(|reply| SessionCommand::ChangeDevices { constraints, reply })
            .await
    }

    /// Send an extension message to every connected partner.
    pub async fn broadcast(
        &self,
        tag: impl Into<String>,
        payload: Value,
    ) -> Result<usize, SessionError> {
        let tag = tag.into();
        self.request(|reply| SessionCommand::Broadcast {
            tag,
            payload,
            reply,
        })
        .await
    }

    /// Leave the room and stop the session. Calling it again is a no-op.
    pub async fn hang_up(&self) -> Result<(), SessionError> {
        match self.request(|reply| SessionCommand::HangUp { reply }).await {
            Err(SessionError::Shutdown) => Ok(()),
            other => other,
        }
    }

    pub async fn partners(&self) -> Result<Vec<PartnerSnapshot>, SessionError> {
        self.request(|reply| SessionCommand::Partners { reply })
            .await
    }

    pub async fn local_media_source(&self) -> Result<MediaSource, SessionError> {
        self.request(|reply| SessionCommand::LocalMediaSource { reply })
            .await
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SessionError::Shutdown)?;
        rx.await.map_err(|_| SessionError::Shutdown)?
    }
}

pub struct SessionBuilder {
    config: SessionConfig,
    devices: Arc<dyn MediaDevices>,
    signaling: Arc<dyn SignalingChannel>,
    observer: Arc<dyn SessionObserver>,
    factory: Option<Arc<dyn TransportFactory>>,
}

impl SessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Defaults to `WebRtcTransportFactory` built from the config.
    pub fn transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Start the controller task. Needs a running tokio runtime.
    pub fn spawn(self) -> Session {
        let factory = self.factory.unwrap_or_else(|| {
            Arc::new(WebRtcTransportFactory::new(self.config.transport.clone()))
        });
        let (commands, command_rx) = mpsc::channel(self.config.command_capacity.max(1));

        let controller = SessionController::new(
            self.config,
            self.devices,
            self.signaling,
            self.observer,
            factory,
            command_rx,
        );
        tokio::spawn(controller.run());

        Session { commands }
    }
}

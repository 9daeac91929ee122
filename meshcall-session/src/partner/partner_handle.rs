use crate::error::SessionError;
use crate::partner::{NegotiationState, PartnerCommand, PartnerSnapshot};
use meshcall_core::PartnerId;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Controller-side end of a partner connection.
pub struct PartnerHandle {
    partner: PartnerId,
    generation: u64,
    sender: mpsc::Sender<PartnerCommand>,
    status: watch::Receiver<PartnerSnapshot>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PartnerHandle {
    pub(crate) fn new(
        partner: PartnerId,
        generation: u64,
        sender: mpsc::Sender<PartnerCommand>,
        status: watch::Receiver<PartnerSnapshot>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            partner,
            generation,
            sender,
            status,
            cancel,
            task,
        }
    }

    pub fn partner(&self) -> PartnerId {
        self.partner
    }

    /// Distinguishes successive connections to the same partner.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> PartnerSnapshot {
        *self.status.borrow()
    }

    pub fn state(&self) -> NegotiationState {
        self.status.borrow().state
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed() || self.state().is_closed()
    }

    /// Queue a command behind everything already sent to this partner.
    /// Never waits: a worker that fell a whole inbox behind loses the command.
    pub fn send(&self, command: PartnerCommand) -> Result<(), SessionError> {
        let label = command.label();
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => {
                warn!(
                    "Dropped {} command for partner {}: inbox is full",
                    label, self.partner
                );
                SessionError::InboxFull(self.partner)
            }
            TrySendError::Closed(_) => {
                debug!(
                    "Dropped {} command for partner {}: worker has exited",
                    label, self.partner
                );
                SessionError::StaleMessage(self.partner)
            }
        })
    }

    /// Wait until the connection reaches `state` (or closes).
    pub async fn wait_for(&self, state: NegotiationState) -> NegotiationState {
        let mut status = self.status.clone();
        match status
            .wait_for(|s| s.state == state || s.state.is_closed())
            .await
        {
            Ok(snapshot) => snapshot.state,
            Err(_) => NegotiationState::Closed,
        }
    }

    /// Stop the worker without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel in-flight work and wait until the transport is released.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Worker for partner {} ended abnormally: {}", self.partner, e);
        }
    }
}

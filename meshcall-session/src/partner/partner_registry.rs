use crate::error::SessionError;
use crate::media::{TrackDistributor, TrackSet};
use crate::partner::{
    PartnerCommand, PartnerConnection, PartnerContext, PartnerHandle, PartnerSnapshot,
};
use meshcall_core::PartnerId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Active partner connections, at most one per partner id.
pub struct PartnerRegistry {
    partners: HashMap<PartnerId, PartnerHandle>,
    next_generation: u64,
    ctx: Arc<PartnerContext>,
}

impl PartnerRegistry {
    pub fn new(ctx: PartnerContext) -> Self {
        Self {
            partners: HashMap::new(),
            next_generation: 0,
            ctx: Arc::new(ctx),
        }
    }

    /// Fresh connection that immediately offers (caller path).
    /// An existing connection to `partner` is torn down first.
    pub async fn add_or_replace(
        &mut self,
        partner: PartnerId,
        tracks: &TrackSet,
    ) -> Result<&PartnerHandle, SessionError> {
        let handle = self.open(partner, tracks).await?;
        handle.send(PartnerCommand::CreateOffer)?;
        Ok(handle)
    }

    /// Fresh connection left idle, waiting for the partner's offer.
    pub async fn open(
        &mut self,
        partner: PartnerId,
        tracks: &TrackSet,
    ) -> Result<&PartnerHandle, SessionError> {
        if self.remove(partner).await {
            info!("Replacing connection to partner {}", partner);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = self
            .ctx
            .factory
            .open(partner, events_tx)
            .await
            .map_err(|e| SessionError::negotiation(partner, e))?;

        self.next_generation += 1;
        let handle = PartnerConnection::spawn(
            partner,
            self.next_generation,
            self.ctx.clone(),
            transport,
            events_rx,
        );
        TrackDistributor::sync_one(&handle, tracks.clone(), true)?;

        info!(
            "Opened connection to partner {} (generation {})",
            partner,
            handle.generation()
        );
        Ok(self.partners.entry(partner).insert_entry(handle).into_mut())
    }

    pub fn lookup(&self, partner: PartnerId) -> Option<&PartnerHandle> {
        self.partners.get(&partner)
    }

    pub fn contains(&self, partner: PartnerId) -> bool {
        self.partners.contains_key(&partner)
    }

    /// Close and forget the connection. `false` when there was none.
    pub async fn remove(&mut self, partner: PartnerId) -> bool {
        let Some(handle) = self.partners.remove(&partner) else {
            return false;
        };

        handle.close().await;
        true
    }

    /// Like `remove`, but only if `generation` is still the registered one.
    pub async fn remove_generation(&mut self, partner: PartnerId, generation: u64) -> bool {
        match self.partners.get(&partner) {
            Some(handle) if handle.generation() == generation => self.remove(partner).await,
            Some(_) => {
                debug!(
                    "Ignoring stale failure of partner {} generation {}",
                    partner, generation
                );
                false
            }
            None => false,
        }
    }

    /// Deliver a command to every live connection; closed ones are skipped.
    pub fn for_each<F>(&self, command: F) -> usize
    where
        F: Fn(&PartnerHandle) -> PartnerCommand,
    {
        let mut delivered = 0;
        for handle in self.partners.values() {
            if handle.is_closed() {
                continue;
            }
            if handle.send(command(handle)).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Close every connection and wait for all transports to be released.
    pub async fn close_all(&mut self) {
        let handles: Vec<_> = self.partners.drain().map(|(_, h)| h).collect();
        for handle in &handles {
            handle.cancel();
        }
        for handle in handles {
            handle.close().await;
        }
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    pub fn ids(&self) -> Vec<PartnerId> {
        let mut ids: Vec<_> = self.partners.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn snapshots(&self) -> Vec<PartnerSnapshot> {
        let mut snapshots: Vec<_> = self.partners.values().map(|h| h.snapshot()).collect();
        snapshots.sort_by_key(|s| s.partner);
        snapshots
    }
}

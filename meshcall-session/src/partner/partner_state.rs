use meshcall_core::PartnerId;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationState {
    Idle,
    OfferSent,
    AnswerPending,
    Connected,
    Closed,
}

impl NegotiationState {
    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which side sent the first offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationRole {
    Caller,
    Callee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartnerSnapshot {
    pub partner: PartnerId,
    pub state: NegotiationState,
    pub role: Option<NegotiationRole>,
}

impl PartnerSnapshot {
    pub(crate) fn idle(partner: PartnerId) -> Self {
        Self {
            partner,
            state: NegotiationState::Idle,
            role: None,
        }
    }
}

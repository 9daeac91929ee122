use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Upper bound (exclusive) for randomly drawn participant ids.
pub const PARTNER_ID_RANGE: u32 = 1_000_000_000;

/// Process-local participant identity. Random, not cryptographically unique.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct PartnerId(pub u32);

impl PartnerId {
    pub fn random() -> Self {
        Self(rand::thread_rng().gen_range(0..PARTNER_ID_RANGE))
    }

    /// The lower id is the polite side when both partners offer at once.
    pub fn is_polite_towards(&self, other: &PartnerId) -> bool {
        self.0 < other.0
    }
}

impl From<u32> for PartnerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for PartnerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

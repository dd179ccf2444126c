use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Short display id given to every component instance
///
/// Ids are random in `1..10000` and only meant for humans reading logs;
/// they are not guaranteed unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(u16);

impl ComponentId {
    /// Largest id `random` can produce
    pub const MAX: u16 = 9999;

    pub fn random() -> Self {
        Self(rand::rng().random_range(1..=Self::MAX))
    }

    /// Every id `random` can produce, in ascending order
    pub fn all() -> impl Iterator<Item = ComponentId> {
        (1..=Self::MAX).map(Self)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl From<u16> for ComponentId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// Payload extraction from intercepted response bodies.
// Pure functions turning raw bytes into a normalized observation, or a logged miss.

pub mod direct;
pub mod embedded;

use crate::backend::{Coordinates, Store};

pub use direct::extract_nearby;
pub use embedded::{END_MARKER, START_MARKER, extract_listing};

/// Stations discovered in one intercepted response.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub stores: Vec<Store>,
    pub channel: i64,
    /// Locality named by the payload itself, if any.
    pub locality: Option<String>,
    /// Coordinates usable for resolving the locality when it is not named.
    pub anchor: Option<Coordinates>,
}

impl Observation {
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

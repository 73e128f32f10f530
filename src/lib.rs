// stationtap library crate.
// Intercepts station listings, caches per-station statistics, and ranks vehicle models.

pub mod analyze;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod geocode;
pub mod intercept;
pub mod pipeline;
pub mod server;

pub use error::{Error, Result};

// Analytics backend module.
// Provides the client, endpoints and payload types for the station statistics API.

pub mod client;
pub mod endpoints;
pub mod fetcher;
pub mod types;

pub use client::{BackendClient, DEFAULT_BACKEND_HOST, DEFAULT_BASE_URL};
pub use fetcher::StatsFetcher;
pub use types::*;

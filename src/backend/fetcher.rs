// Fetcher seam between the cache merger and the backend.
// Lets the merger run against the live client or an in-memory source.

use async_trait::async_trait;

use crate::error::Result;

use super::client::BackendClient;
use super::types::{CurrentOrderItem, RepurchaseItem};

/// Source of per-station statistics. Each call is a single attempt.
#[async_trait]
pub trait StatsFetcher: Send + Sync {
    async fn current_orders(&self, store_id: &str, channel: i64) -> Result<Vec<CurrentOrderItem>>;

    async fn repurchase_drivers(&self, store_id: &str, channel: i64)
    -> Result<Vec<RepurchaseItem>>;
}

#[async_trait]
impl StatsFetcher for BackendClient {
    async fn current_orders(&self, store_id: &str, channel: i64) -> Result<Vec<CurrentOrderItem>> {
        self.get_current_orders(store_id, channel).await
    }

    async fn repurchase_drivers(
        &self,
        store_id: &str,
        channel: i64,
    ) -> Result<Vec<RepurchaseItem>> {
        self.get_repurchase_drivers(store_id, channel).await
    }
}

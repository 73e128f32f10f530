// Statistics endpoint functions.
// Provides typed methods for the per-station order and repurchase queries.

use tracing::debug;

use crate::error::Result;

use super::client::BackendClient;
use super::types::{CurrentOrderItem, RepurchaseItem, StatsResponse};

const CURRENT_ORDER_ENDPOINT: &str = "/front/statistic/currentorder";
const REPURCHASE_ENDPOINT: &str = "/front/statistic/repurchase";

impl BackendClient {
    /// Get the live orders currently visible at a station.
    pub async fn get_current_orders(
        &self,
        store_id: &str,
        channel: i64,
    ) -> Result<Vec<CurrentOrderItem>> {
        let params = [("am_channel", channel.to_string()), ("store_id", store_id.to_string())];
        let response = self.get_with_params(CURRENT_ORDER_ENDPOINT, &params).await?;
        let wrapper: StatsResponse<CurrentOrderItem> = response.json().await?;
        debug!(store_id, total = wrapper.data.total, "fetched current orders");
        Ok(wrapper.data.items)
    }

    /// Get repeat-purchase statistics for drivers at a station.
    pub async fn get_repurchase_drivers(
        &self,
        store_id: &str,
        channel: i64,
    ) -> Result<Vec<RepurchaseItem>> {
        let params = [("am_channel", channel.to_string()), ("store_id", store_id.to_string())];
        let response = self.get_with_params(REPURCHASE_ENDPOINT, &params).await?;
        let wrapper: StatsResponse<RepurchaseItem> = response.json().await?;
        debug!(store_id, total = wrapper.data.total, "fetched repurchase drivers");
        Ok(wrapper.data.items)
    }
}

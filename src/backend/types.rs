// Backend payload types.
// Defines structs for deserializing listing pages, nearby-store queries and statistics responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel the client attaches to map-based nearby-store queries.
pub const MAP_CHANNEL: i64 = 10001;

/// A longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lng: f64,
    pub lat: f64,
}

/// A station as it appears in the map section of a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub store_id: String,
    pub name: String,
    pub logo: String,
    pub logo_x: String,
    pub logo_xx: String,
    pub lat: f64,
    pub lng: f64,
    pub rawid: String,
    pub distance: String,
    pub price: String,
}

impl Store {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lng: self.lng,
            lat: self.lat,
        }
    }
}

/// Listing page configuration embedded in the station index page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListingPayload {
    pub am_channel: i64,
    pub city_id: String,
    pub city_name: String,
    pub lat: f64,
    pub lng: f64,
    pub store_count: i64,
    pub store_type: i64,
    pub store_for_map: Vec<Store>,
}

/// Response of the nearby-store map query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NearStoreResponse {
    pub status: i64,
    pub msg: String,
    pub data: NearStoreData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NearStoreData {
    pub store_count: i64,
    pub store_type: i64,
    pub store_for_map: Vec<Store>,
}

/// A live order visible at a station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentOrderItem {
    pub id: String,
    pub uid: String,
    pub pid: String,
    pub user_name: String,
    pub avater: String,
    pub sale_price: String,
    pub real_price: String,
    pub real_price_fmt: String,
    pub status: i64,
    pub pay_time: i64,
    pub pay_time_fmt: String,
    pub car_model: String,
    pub save_price: String,
    pub save_price_fmt: String,
}

impl CurrentOrderItem {
    /// Payment time as a UTC timestamp, if the backend supplied one.
    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        if self.pay_time <= 0 {
            return None;
        }
        DateTime::from_timestamp(self.pay_time, 0)
    }
}

/// Repeat-purchase statistics for one driver at a station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepurchaseItem {
    pub driver_id: String,
    pub avanter: String,
    pub driver_name: String,
    pub user_name: String,
    pub car_model: String,
    pub order_count_1m: i64,
    pub ordercount_1m: i64,
    pub order_discount_1m_fmt: String,
}

/// Envelope shared by the statistics endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse<T> {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub msg: String,
    pub data: StatsPage<T>,
}

/// One page of statistics items.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsPage<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

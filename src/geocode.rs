// Reverse geocoding and locality resolution.
// Names the locality of observations whose payload carries only coordinates.

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::backend::Coordinates;
use crate::error::{Error, Result};

/// Locality used when no name can be determined.
pub const UNKNOWN_LOCALITY: &str = "unknown";

const REGEO_URL: &str = "https://restapi.amap.com/v3/geocode/regeo";

/// AMap reverse geocoding response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegeoResponse {
    pub status: String,
    pub info: String,
    pub infocode: String,
    pub regeocode: Regeocode,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Regeocode {
    #[serde(rename = "addressComponent")]
    pub address_component: AddressComponent,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddressComponent {
    pub country: String,
    pub province: String,
    /// A string, or an empty array for municipalities.
    pub city: serde_json::Value,
}

impl RegeoResponse {
    /// City name, falling back to the province for municipalities.
    pub fn locality(&self) -> Option<String> {
        let component = &self.regeocode.address_component;
        match component.city.as_str() {
            Some(city) if !city.is_empty() => Some(city.to_string()),
            _ if !component.province.is_empty() => Some(component.province.clone()),
            _ => None,
        }
    }
}

/// Client for the AMap reverse geocoding endpoint.
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    key: String,
}

impl GeocodeClient {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build().map_err(Error::Api)?;
        Ok(Self {
            client,
            key: key.into(),
        })
    }

    /// Look up the locality containing the given coordinates.
    pub async fn reverse(&self, at: Coordinates) -> Result<String> {
        let location = format!("{},{}", at.lng, at.lat);
        let params = [("key", self.key.as_str()), ("location", location.as_str())];
        let response: RegeoResponse = self
            .client
            .get(REGEO_URL)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status == "0" {
            return Err(Error::Geocode(response.info));
        }
        response
            .locality()
            .ok_or_else(|| Error::Geocode(format!("no locality at {}", location)))
    }
}

/// Decides which locality directory a batch is filed under.
///
/// A locality named by the payload always wins. Otherwise the anchor is reverse
/// geocoded when a client is configured; without one, or when the lookup fails,
/// the batch goes to [`UNKNOWN_LOCALITY`].
#[derive(Debug, Clone, Default)]
pub struct LocalityResolver {
    geocoder: Option<GeocodeClient>,
}

impl LocalityResolver {
    pub fn new(geocoder: Option<GeocodeClient>) -> Self {
        Self { geocoder }
    }

    pub async fn resolve(&self, named: Option<&str>, anchor: Option<Coordinates>) -> String {
        if let Some(name) = named.filter(|name| !name.is_empty()) {
            return name.to_string();
        }

        let (Some(geocoder), Some(anchor)) = (&self.geocoder, anchor) else {
            return UNKNOWN_LOCALITY.to_string();
        };

        match geocoder.reverse(anchor).await {
            Ok(locality) => locality,
            Err(e) => {
                warn!(lng = anchor.lng, lat = anchor.lat, error = %e, "reverse geocoding failed");
                UNKNOWN_LOCALITY.to_string()
            }
        }
    }
}

// Direct-body extraction.
// The nearby-store query answers with a plain JSON envelope.

use tracing::warn;

use crate::backend::{MAP_CHANNEL, NearStoreResponse};

use super::Observation;

/// Extract the nearby-store observation from a JSON response body.
/// The payload names no locality; the first station's position is the anchor.
pub fn extract_nearby(body: &[u8]) -> Option<Observation> {
    let response: NearStoreResponse = match serde_json::from_slice(body) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "nearby store response is not valid JSON");
            return None;
        }
    };

    let stores = response.data.store_for_map;
    let anchor = stores.first().map(|store| store.coordinates());

    Some(Observation {
        stores,
        channel: MAP_CHANNEL,
        locality: None,
        anchor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Coordinates;

    #[test]
    fn test_extract_nearby() {
        let body = br#"{
            "status": 0,
            "msg": "ok",
            "data": {
                "store_count": 2,
                "store_for_map": [
                    {"store_id": "77", "name": "East", "lat": 39.9, "lng": 116.4},
                    {"store_id": "78", "name": "West", "lat": 39.8, "lng": 116.3}
                ],
                "store_list": [{"anything": true}]
            }
        }"#;

        let observation = extract_nearby(body).unwrap();
        assert_eq!(observation.channel, MAP_CHANNEL);
        assert!(observation.locality.is_none());
        assert_eq!(observation.stores.len(), 2);
        assert_eq!(
            observation.anchor,
            Some(Coordinates {
                lng: 116.4,
                lat: 39.9
            })
        );
    }

    #[test]
    fn test_unparsable_body() {
        assert!(extract_nearby(b"<html>rate limited</html>").is_none());
        assert!(extract_nearby(b"").is_none());
    }

    #[test]
    fn test_no_stores() {
        let observation = extract_nearby(br#"{"status":0,"data":{}}"#).unwrap();
        assert!(observation.is_empty());
        assert!(observation.anchor.is_none());
    }
}

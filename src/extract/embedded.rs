// Embedded-literal extraction.
// The listing page assigns its configuration from an escaped JSON string inside a script.

use tracing::warn;

use crate::backend::{Coordinates, ListingPayload};

use super::Observation;

/// Opening of the inline assignment that carries the listing payload.
pub const START_MARKER: &str = "$CONFIG = JSON.parse(";
/// End of the assignment statement.
pub const END_MARKER: &str = ");\n";

/// Extract the listing observation embedded in an index page body.
pub fn extract_listing(body: &[u8]) -> Option<Observation> {
    let literal = match embedded_literal(body) {
        Some(literal) => literal,
        None => {
            warn!("listing payload markers not found");
            return None;
        }
    };

    // One layer of string escaping; the literal uses JSON string syntax.
    let json: String = match serde_json::from_slice(literal.trim_ascii()) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "listing payload literal could not be unescaped");
            return None;
        }
    };

    let payload: ListingPayload = match serde_json::from_str(&json) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "listing payload is not valid JSON");
            return None;
        }
    };

    Some(normalize(payload))
}

/// The bytes strictly between the start marker and the first end marker after it.
/// Only the markers are searched, so the rest of the page may use any encoding.
fn embedded_literal(body: &[u8]) -> Option<&[u8]> {
    let start = find(body, START_MARKER.as_bytes())? + START_MARKER.len();
    let len = find(&body[start..], END_MARKER.as_bytes())?;
    Some(&body[start..start + len])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn normalize(payload: ListingPayload) -> Observation {
    let locality = Some(payload.city_name.trim().to_string()).filter(|name| !name.is_empty());
    let anchor = (payload.lat != 0.0 || payload.lng != 0.0).then_some(Coordinates {
        lng: payload.lng,
        lat: payload.lat,
    });

    Observation {
        stores: payload.store_for_map,
        channel: payload.am_channel,
        locality,
        anchor,
    }
}

// Cache store for reading and writing record maps.
// Handles JSON serialization, freshness checks, and atomic filesystem writes.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;

/// Minimum interval between two fetches of the same station file.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(5);

/// Read an id-keyed record map, returning None if the file does not exist.
pub fn read_map<T: DeserializeOwned>(path: &Path) -> Result<Option<BTreeMap<String, T>>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let map: BTreeMap<String, T> = serde_json::from_str(&contents)?;
    Ok(Some(map))
}

/// Replace a record map file in full.
pub fn write_map<T: Serialize>(path: &Path, map: &BTreeMap<String, T>) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(map)?;

    // Write atomically via temp file
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Get the modification time of a cache file.
pub fn modified_at(path: &Path) -> io::Result<DateTime<Utc>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Check whether a file modified at `modified` is still inside the window at `now`.
/// A modification time ahead of `now` counts as fresh.
pub fn is_fresh(modified: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
    now.signed_duration_since(modified) < window
}

/// Check whether an existing file is inside the freshness window.
/// Missing or unreadable files are never fresh.
pub fn is_file_fresh(path: &Path, window: Duration) -> bool {
    match modified_at(path) {
        Ok(modified) => is_fresh(modified, Utc::now(), window),
        Err(_) => false,
    }
}

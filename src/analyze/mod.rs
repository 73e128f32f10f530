// Locality analysis over the cached station data.
// Aggregates order and repurchase files into per-model counts and scores.

pub mod report;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::backend::{CurrentOrderItem, RepurchaseItem};
use crate::cache::paths::{self, RecordKind};
use crate::cache::store;
use crate::error::{Error, Result};

pub use report::{RankedModel, Report, format_average};

/// Reads every cached station file of one locality.
pub struct LocalityAnalyzer {
    locality: String,
    locality_dir: PathBuf,
}

impl LocalityAnalyzer {
    /// Open a locality, failing if nothing has been cached for it.
    pub fn open(data_dir: &Path, locality: &str) -> Result<Self> {
        let locality_dir = paths::locality_dir(data_dir, locality);
        if !locality_dir.is_dir() {
            return Err(Error::LocalityNotFound(locality.to_string()));
        }
        Ok(Self {
            locality: locality.to_string(),
            locality_dir,
        })
    }

    pub fn locality(&self) -> &str {
        &self.locality
    }

    /// Number of live orders seen per vehicle model.
    pub fn order_counts(&self) -> HashMap<String, u64> {
        let mut counts = HashMap::new();
        self.for_each_record::<CurrentOrderItem>(RecordKind::Order, |item| {
            if !item.car_model.is_empty() {
                *counts.entry(item.car_model).or_insert(0) += 1;
            }
        });
        counts
    }

    /// Sum of trailing-month order counts per vehicle model.
    pub fn repurchase_scores(&self) -> HashMap<String, i64> {
        let mut scores = HashMap::new();
        self.for_each_record::<RepurchaseItem>(RecordKind::Repurchase, |item| {
            if !item.car_model.is_empty() {
                *scores.entry(item.car_model).or_insert(0) += item.order_count_1m;
            }
        });
        scores
    }

    /// Most recent payment time among the cached live orders.
    pub fn latest_payment(&self) -> Option<DateTime<Utc>> {
        let mut latest = None;
        self.for_each_record::<CurrentOrderItem>(RecordKind::Order, |item| {
            latest = latest.max(item.paid_at());
        });
        latest
    }

    /// Build the ranking report.
    pub fn report(&self) -> Report {
        Report::new(self.order_counts(), self.repurchase_scores())
    }

    fn for_each_record<T: DeserializeOwned>(&self, kind: RecordKind, mut visit: impl FnMut(T)) {
        let dir = self.locality_dir.join(kind.dir_name());
        for entry in WalkDir::new(&dir).into_iter().filter_map(|entry| entry.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match store::read_map::<T>(path) {
                Ok(Some(records)) => {
                    debug!(path = %path.display(), count = records.len(), "read records");
                    records.into_values().for_each(&mut visit);
                }
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
            }
        }
    }
}

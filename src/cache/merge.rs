// Incremental merge of fetched station records into the cache tree.
// Owns freshness gating, the registry update, and the per-file load/merge/replace cycle.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::backend::{CurrentOrderItem, RepurchaseItem, StatsFetcher, Store};
use crate::error::Result;

use super::locks::FileLocks;
use super::paths::{self, RecordKind};
use super::store::{self, FRESHNESS_WINDOW};

/// A record that lives in an id-keyed cache file.
pub trait CacheRecord: Serialize + DeserializeOwned + Send {
    fn record_id(&self) -> &str;
}

impl CacheRecord for CurrentOrderItem {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl CacheRecord for RepurchaseItem {
    fn record_id(&self) -> &str {
        &self.driver_id
    }
}

/// Result of one station/kind merge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// File was written inside the freshness window; nothing fetched.
    Fresh,
    /// Records were fetched and the file replaced.
    Merged { fetched: usize, total: usize },
    FetchFailed,
    WriteFailed,
}

/// Counts of merge outcomes across one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub merged: usize,
    pub fresh: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Merged { .. } => self.merged += 1,
            MergeOutcome::Fresh => self.fresh += 1,
            MergeOutcome::FetchFailed | MergeOutcome::WriteFailed => self.failed += 1,
        }
    }
}

/// Merges fetched statistics into the cache rooted at `root`.
pub struct CacheMerger<F> {
    root: PathBuf,
    fetcher: F,
    locks: FileLocks,
    window: Duration,
}

impl<F: StatsFetcher> CacheMerger<F> {
    pub fn new(root: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            root: root.into(),
            fetcher,
            locks: FileLocks::new(),
            window: FRESHNESS_WINDOW,
        }
    }

    /// Override the freshness window.
    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Process every station discovered in one observation.
    /// Registry first, then all order files, then all repurchase files, one fetch at a time.
    pub async fn process_batch(&self, locality: &str, channel: i64, stores: &[Store]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        match self.record_stores(locality, stores).await {
            Ok(count) => debug!(locality, count, "station registry updated"),
            Err(e) => warn!(locality, error = %e, "station registry update failed"),
        }

        for kind in RecordKind::ALL {
            for store in stores {
                let outcome = self.merge_store(locality, kind, &store.store_id, channel).await;
                summary.record(outcome);
            }
        }

        info!(
            locality,
            stores = stores.len(),
            merged = summary.merged,
            fresh = summary.fresh,
            failed = summary.failed,
            "batch processed"
        );
        summary
    }

    /// Overwrite-by-id the observed stations into the locality registry.
    /// An unparsable registry is left untouched and reported as an error.
    pub async fn record_stores(&self, locality: &str, stores: &[Store]) -> Result<usize> {
        if stores.is_empty() {
            return Ok(0);
        }

        let path = paths::registry_path(&self.root, locality);
        let _guard = self.locks.lock(&path).await;

        let mut registry: BTreeMap<String, Store> = store::read_map(&path)?.unwrap_or_default();
        for s in stores.iter().filter(|s| !s.store_id.is_empty()) {
            registry.insert(s.store_id.clone(), s.clone());
        }

        store::write_map(&path, &registry)?;
        Ok(registry.len())
    }

    /// Fetch and merge one station's records of the given kind.
    pub async fn merge_store(
        &self,
        locality: &str,
        kind: RecordKind,
        store_id: &str,
        channel: i64,
    ) -> MergeOutcome {
        let path = paths::record_path(&self.root, locality, kind, store_id);
        match kind {
            RecordKind::Order => {
                self.merge_file(&path, || self.fetcher.current_orders(store_id, channel))
                    .await
            }
            RecordKind::Repurchase => {
                self.merge_file(&path, || self.fetcher.repurchase_drivers(store_id, channel))
                    .await
            }
        }
    }

    async fn merge_file<T, Fut>(&self, path: &Path, fetch: impl FnOnce() -> Fut) -> MergeOutcome
    where
        T: CacheRecord,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let _guard = self.locks.lock(path).await;

        if store::is_file_fresh(path, self.window) {
            debug!(path = %path.display(), "skipping fresh file");
            return MergeOutcome::Fresh;
        }

        let mut records = match store::read_map::<T>(path) {
            Ok(Some(records)) => records,
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable cache file, starting empty");
                BTreeMap::new()
            }
        };

        let fetched = match fetch().await {
            Ok(items) => items,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "fetch failed");
                return MergeOutcome::FetchFailed;
            }
        };
        let fetched_count = fetched.len();
        merge_records(&mut records, fetched);

        if let Err(e) = store::write_map(path, &records) {
            warn!(path = %path.display(), error = %e, "write failed");
            return MergeOutcome::WriteFailed;
        }

        MergeOutcome::Merged {
            fetched: fetched_count,
            total: records.len(),
        }
    }
}

/// Insert or overwrite each item by id. Existing ids not in `items` are kept.
pub fn merge_records<T: CacheRecord>(records: &mut BTreeMap<String, T>, items: Vec<T>) {
    for item in items {
        if item.record_id().is_empty() {
            continue;
        }
        records.insert(item.record_id().to_string(), item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::SystemTime;
    use tempfile::TempDir;

    /// Serves scripted order batches and fixed repurchase items.
    #[derive(Default)]
    struct FakeFetcher {
        orders: Mutex<Vec<Vec<CurrentOrderItem>>>,
        repurchase: Vec<RepurchaseItem>,
        failing_store: Option<String>,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn with_orders(batches: Vec<Vec<CurrentOrderItem>>) -> Self {
            Self {
                orders: Mutex::new(batches),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatsFetcher for FakeFetcher {
        async fn current_orders(&self, store_id: &str, _channel: i64) -> Result<Vec<CurrentOrderItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_store.as_deref() == Some(store_id) {
                return Err(Error::Status {
                    status: 502,
                    url: "http://backend/currentorder".to_string(),
                });
            }
            let mut orders = self.orders.lock().unwrap();
            if orders.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(orders.remove(0))
            }
        }

        async fn repurchase_drivers(
            &self,
            _store_id: &str,
            _channel: i64,
        ) -> Result<Vec<RepurchaseItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.repurchase.clone())
        }
    }

    fn order(id: &str, model: &str) -> CurrentOrderItem {
        CurrentOrderItem {
            id: id.to_string(),
            car_model: model.to_string(),
            ..Default::default()
        }
    }

    fn station(id: &str) -> Store {
        Store {
            store_id: id.to_string(),
            name: format!("Station {}", id),
            ..Default::default()
        }
    }

    /// Push a file's mtime into the past to simulate elapsed time.
    fn backdate(path: &Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs))
            .unwrap();
    }

    fn order_path(root: &Path, store_id: &str) -> PathBuf {
        paths::record_path(root, "成都市", RecordKind::Order, store_id)
    }

    #[test]
    fn test_merge_records_is_set_union() {
        let mut records = BTreeMap::new();
        merge_records(&mut records, vec![order("1", "A"), order("2", "B")]);
        merge_records(&mut records, vec![order("2", "B2"), order("3", "C")]);

        let ids: Vec<&str> = records.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(records["2"].car_model, "B2");
    }

    #[test]
    fn test_merge_records_skips_empty_ids() {
        let mut records = BTreeMap::new();
        merge_records(&mut records, vec![order("", "A")]);
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let batch = vec![order("1", "A"), order("2", "B")];
        let merger = CacheMerger::new(
            temp_dir.path(),
            FakeFetcher::with_orders(vec![batch.clone(), batch]),
        )
        .with_freshness_window(Duration::ZERO);
        let path = order_path(temp_dir.path(), "s1");

        merger
            .merge_store("成都市", RecordKind::Order, "s1", 1)
            .await;
        let once = fs::read(&path).unwrap();

        merger
            .merge_store("成都市", RecordKind::Order, "s1", 1)
            .await;
        let twice = fs::read(&path).unwrap();

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_fetch_omitting_ids_keeps_them() {
        let temp_dir = TempDir::new().unwrap();
        let merger = CacheMerger::new(
            temp_dir.path(),
            FakeFetcher::with_orders(vec![vec![order("1", "A"), order("2", "B")], vec![order("3", "C")]]),
        )
        .with_freshness_window(Duration::ZERO);

        merger.merge_store("成都市", RecordKind::Order, "s1", 1).await;
        let outcome = merger.merge_store("成都市", RecordKind::Order, "s1", 1).await;

        assert_eq!(outcome, MergeOutcome::Merged { fetched: 1, total: 3 });
        let records: BTreeMap<String, CurrentOrderItem> =
            store::read_map(&order_path(temp_dir.path(), "s1")).unwrap().unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_fresh_file_is_not_refetched() {
        let temp_dir = TempDir::new().unwrap();
        let merger = CacheMerger::new(
            temp_dir.path(),
            FakeFetcher::with_orders(vec![vec![order("1", "A")], vec![order("2", "B")]]),
        );
        let path = order_path(temp_dir.path(), "s1");

        let first = merger.merge_store("成都市", RecordKind::Order, "s1", 1).await;
        assert!(matches!(first, MergeOutcome::Merged { .. }));
        let before = fs::read(&path).unwrap();

        let second = merger.merge_store("成都市", RecordKind::Order, "s1", 1).await;
        assert_eq!(second, MergeOutcome::Fresh);
        assert_eq!(merger.fetcher.calls(), 1);
        assert_eq!(fs::read(&path).unwrap(), before);

        backdate(&path, 6);
        let third = merger.merge_store("成都市", RecordKind::Order, "s1", 1).await;
        assert_eq!(third, MergeOutcome::Merged { fetched: 1, total: 2 });
        assert_eq!(merger.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = order_path(temp_dir.path(), "s1");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{truncated").unwrap();
        backdate(&path, 60);

        let merger = CacheMerger::new(
            temp_dir.path(),
            FakeFetcher::with_orders(vec![vec![order("9", "Z")]]),
        );
        let outcome = merger.merge_store("成都市", RecordKind::Order, "s1", 1).await;

        assert_eq!(outcome, MergeOutcome::Merged { fetched: 1, total: 1 });
        let records: BTreeMap<String, CurrentOrderItem> = store::read_map(&path).unwrap().unwrap();
        assert!(records.contains_key("9"));
    }

    #[tokio::test]
    async fn test_failed_store_does_not_abort_batch() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher {
            orders: Mutex::new(vec![vec![order("1", "A")]]),
            repurchase: vec![RepurchaseItem {
                driver_id: "d1".to_string(),
                car_model: "A".to_string(),
                order_count_1m: 4,
                ..Default::default()
            }],
            failing_store: Some("bad".to_string()),
            ..Default::default()
        };
        let merger = CacheMerger::new(temp_dir.path(), fetcher);

        let summary = merger
            .process_batch("成都市", 1, &[station("bad"), station("good")])
            .await;

        assert_eq!(
            summary,
            BatchSummary {
                merged: 3,
                fresh: 0,
                failed: 1
            }
        );
        assert!(!order_path(temp_dir.path(), "bad").exists());
        assert!(order_path(temp_dir.path(), "good").exists());
        assert!(
            paths::record_path(temp_dir.path(), "成都市", RecordKind::Repurchase, "bad").exists()
        );

        let registry: BTreeMap<String, Store> =
            store::read_map(&paths::registry_path(temp_dir.path(), "成都市"))
                .unwrap()
                .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry["good"].name, "Station good");
    }

    #[tokio::test]
    async fn test_corrupt_registry_is_left_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = paths::registry_path(temp_dir.path(), "成都市");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let merger = CacheMerger::new(temp_dir.path(), FakeFetcher::default());
        assert!(merger.record_stores("成都市", &[station("s1")]).await.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json");
    }

    #[tokio::test]
    async fn test_observations_ten_seconds_apart_accumulate() {
        let temp_dir = TempDir::new().unwrap();
        let merger = CacheMerger::new(
            temp_dir.path(),
            FakeFetcher::with_orders(vec![
                vec![order("o1", "A")],
                vec![order("o2", "B")],
                vec![order("o3", "C")],
            ]),
        );
        let stores = [station("s1")];
        let path = order_path(temp_dir.path(), "s1");

        merger.process_batch("成都市", 1, &stores).await;
        backdate(&path, 10);

        merger.process_batch("成都市", 1, &stores).await;
        let after_second = fs::read(&path).unwrap();
        let records: BTreeMap<String, CurrentOrderItem> = store::read_map(&path).unwrap().unwrap();
        assert_eq!(
            records.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["o1", "o2"]
        );

        // Third observation lands inside the window of the second write
        let summary = merger.process_batch("成都市", 1, &stores).await;
        assert_eq!(summary.fresh, 2);
        assert_eq!(fs::read(&path).unwrap(), after_second);
    }
}

// Cache module for the per-locality station data tree.
// Stores the station registry and merged per-station order and repurchase records.

pub mod locks;
pub mod merge;
pub mod paths;
pub mod store;

pub use locks::FileLocks;
pub use merge::{BatchSummary, CacheMerger, CacheRecord, MergeOutcome};
pub use paths::RecordKind;
pub use store::FRESHNESS_WINDOW;

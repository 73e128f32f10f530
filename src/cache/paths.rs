// Cache path utilities.
// Constructs filesystem paths for the locality / record-kind / station hierarchy.

use std::path::{Path, PathBuf};

/// Station registry file at the root of each locality directory.
pub const REGISTRY_FILE: &str = "stores.json";

/// Kind of per-station record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Order,
    Repurchase,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Order, RecordKind::Repurchase];

    /// Directory holding this kind's files inside a locality directory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            RecordKind::Order => "order",
            RecordKind::Repurchase => "repurchase",
        }
    }
}

/// Path to a locality's directory.
pub fn locality_dir(root: &Path, locality: &str) -> PathBuf {
    root.join(sanitize_name(locality))
}

/// Path to a locality's station registry.
pub fn registry_path(root: &Path, locality: &str) -> PathBuf {
    locality_dir(root, locality).join(REGISTRY_FILE)
}

/// Path to the directory of one record kind within a locality.
pub fn record_dir(root: &Path, locality: &str, kind: RecordKind) -> PathBuf {
    locality_dir(root, locality).join(kind.dir_name())
}

/// Path to one station's record file.
pub fn record_path(root: &Path, locality: &str, kind: RecordKind, store_id: &str) -> PathBuf {
    record_dir(root, locality, kind).join(format!("{}.json", sanitize_name(store_id)))
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
pub fn sanitize_name(name: &str) -> String {
    if name.is_empty() || name == "." || name == ".." {
        return "_".to_string();
    }
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

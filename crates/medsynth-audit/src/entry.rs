//! Manifest entry and manifest types.
//!
//! `ChainEntry` is a single link in the hash chain: it commits to one table's
//! content and to the previous entry. `DatasetManifest` is the sealed record
//! produced when a run finalizes.

use serde::{Deserialize, Serialize};

use medsynth_contracts::run::RunInfo;

/// One table's position in the hash chain for a dataset.
///
/// Each entry commits to the previous entry via `prev_hash`. Changing a
/// single cell of the table changes `content_hash`, which invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    pub table: String,

    pub row_count: usize,

    /// SHA-256 (hex) of the table's canonical JSON.
    pub content_hash: String,

    /// `this_hash` of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// SHA-256 (hex) over (table, sequence, prev_hash, content_hash).
    pub this_hash: String,
}

impl ChainEntry {
    /// The sentinel `prev_hash` of the first entry in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// The sealed fingerprint of one generated dataset.
///
/// Contains no wall-clock fields, so two runs with the same seed and
/// population produce byte-identical manifests. `terminal_hash` is a
/// compact commitment to every table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub run: RunInfo,

    /// All entries in table order (sequence 0 first).
    pub tables: Vec<ChainEntry>,

    /// The `this_hash` of the last entry. Empty if no table was written.
    pub terminal_hash: String,
}

impl DatasetManifest {
    /// Entry for the table called `name`, if it was written.
    pub fn entry(&self, name: &str) -> Option<&ChainEntry> {
        self.tables.iter().find(|e| e.table == name)
    }
}

//! # medsynth-audit
//!
//! SHA-256 hash-chained manifests for generated medsynth datasets.
//!
//! ## Overview
//!
//! Every table a run writes is hashed and wrapped in a `ChainEntry` that
//! links to the previous entry via its SHA-256 hash. The sealed
//! `DatasetManifest` ends in a terminal hash that fingerprints the whole
//! dataset: two runs agree on it exactly when every table is byte-identical.
//! Tampering with any cell breaks the chain and is detected by
//! `verify_tables`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medsynth_audit::InMemoryTableSink;
//!
//! let sink = InMemoryTableSink::new();
//! generator.run(&sink)?;
//!
//! assert!(sink.verify_integrity()?);
//! let manifest = sink.manifest()?.unwrap();
//! ```

pub mod chain;
pub mod entry;
pub mod memory;

pub use chain::{hash_entry, hash_table, verify_chain, verify_tables};
pub use entry::{ChainEntry, DatasetManifest};
pub use memory::{InMemoryTableSink, ManifestBuilder};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use medsynth_catalog::{Catalog, SimulationConfig};
    use medsynth_contracts::{run::RunInfo, table::Table};
    use medsynth_core::{traits::TableSink, Generator};

    use super::{verify_chain, verify_tables, ChainEntry, InMemoryTableSink, ManifestBuilder};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Build a small table with a distinguishable cell.
    fn make_table(name: &str, cell: &str) -> Table {
        Table {
            name: name.to_string(),
            columns: vec!["patient_id".to_string(), "value".to_string()],
            rows: vec![
                vec!["PT00001".to_string(), cell.to_string()],
                vec!["PT00002".to_string(), "fixed".to_string()],
            ],
        }
    }

    fn make_run() -> RunInfo {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        RunInfo {
            seed: 42,
            population_size: 2,
            window_start: day(2024, 1, 1),
            window_end: day(2026, 1, 27),
            reference_date: day(2026, 1, 27),
        }
    }

    fn sink_with_three_tables() -> InMemoryTableSink {
        let sink = InMemoryTableSink::new();
        sink.write_table(&make_table("a", "first")).unwrap();
        sink.write_table(&make_table("b", "second")).unwrap();
        sink.write_table(&make_table("c", "third")).unwrap();
        sink
    }

    fn generate_manifest_hash(seed: u64) -> String {
        let config = SimulationConfig::default().with_overrides(Some(25), Some(seed));
        let generator = Generator::new(config, Catalog::default_catalog().unwrap()).unwrap();
        let sink = InMemoryTableSink::new();
        generator.run(&sink).unwrap();
        assert!(sink.verify_integrity().unwrap());
        sink.manifest().unwrap().unwrap().terminal_hash
    }

    // ── Chain ─────────────────────────────────────────────────────────────────

    /// Writing three tables and verifying produces a valid chain.
    #[test]
    fn test_hash_chain_integrity() {
        let sink = sink_with_three_tables();
        assert!(sink.verify_integrity().unwrap(), "chain must be valid after sequential writes");
    }

    /// Mutating any stored cell is detected.
    #[test]
    fn test_tamper_detection() {
        let sink = sink_with_three_tables();
        {
            let mut state = sink.state.lock().unwrap();
            state.tables[0].rows[0][1] = "TAMPERED".to_string();
        }
        assert!(
            !sink.verify_integrity().unwrap(),
            "chain must detect tampering with a stored table"
        );
    }

    /// Rewriting an entry's content hash breaks its own `this_hash`.
    #[test]
    fn test_forged_entry_detection() {
        let mut builder = ManifestBuilder::new();
        builder.append(&make_table("a", "first")).unwrap();
        builder.append(&make_table("b", "second")).unwrap();
        let mut entries = builder.entries().to_vec();
        assert!(verify_chain(&entries));

        entries[1].content_hash = entries[0].content_hash.clone();
        assert!(!verify_chain(&entries), "forged content hash must break the chain");
    }

    /// Dropping an entry breaks the linkage of the next one.
    #[test]
    fn test_removed_entry_detection() {
        let mut builder = ManifestBuilder::new();
        for name in ["a", "b", "c"] {
            builder.append(&make_table(name, name)).unwrap();
        }
        let mut entries = builder.entries().to_vec();
        entries.remove(1);
        assert!(!verify_chain(&entries));
    }

    /// The first entry's `prev_hash` must equal `ChainEntry::GENESIS_HASH`.
    #[test]
    fn test_genesis_hash() {
        let mut builder = ManifestBuilder::new();
        let first = builder.append(&make_table("a", "first")).unwrap();
        assert_eq!(
            first.prev_hash,
            ChainEntry::GENESIS_HASH,
            "first entry must link to the genesis sentinel hash"
        );
        assert_eq!(first.this_hash.len(), 64);
    }

    /// Sequence numbers must be 0, 1, 2, … with no gaps.
    #[test]
    fn test_sequence_monotonic() {
        let sink = sink_with_three_tables();
        sink.finalize(&make_run()).unwrap();
        let manifest = sink.manifest().unwrap().unwrap();
        for (idx, entry) in manifest.tables.iter().enumerate() {
            assert_eq!(entry.sequence, idx as u64, "sequence at position {} should be {}", idx, idx);
        }
    }

    /// The manifest lists every table, and its terminal hash is the last
    /// entry's hash.
    #[test]
    fn test_manifest_contents() {
        let sink = sink_with_three_tables();
        assert!(sink.manifest().unwrap().is_none(), "no manifest before finalize");

        sink.finalize(&make_run()).unwrap();
        let manifest = sink.manifest().unwrap().unwrap();

        assert_eq!(manifest.run, make_run());
        assert_eq!(manifest.tables.len(), 3);
        assert_eq!(manifest.entry("b").unwrap().row_count, 2);
        assert_eq!(manifest.terminal_hash, manifest.tables.last().unwrap().this_hash);
        assert!(verify_tables(&manifest.tables, &sink.tables().unwrap()).unwrap());
    }

    /// Tables in the wrong order do not match the manifest.
    #[test]
    fn test_reordered_tables_do_not_verify() {
        let sink = sink_with_three_tables();
        let mut tables = sink.tables().unwrap();
        tables.swap(0, 1);
        let mut builder = ManifestBuilder::new();
        for table in sink.tables().unwrap() {
            builder.append(&table).unwrap();
        }
        assert!(!verify_tables(builder.entries(), &tables).unwrap());
    }

    /// An empty chain is trivially valid.
    #[test]
    fn test_verify_empty() {
        assert!(InMemoryTableSink::new().verify_integrity().unwrap());
        assert!(verify_chain(&[]), "verify_chain on empty slice must return true");

        let manifest = ManifestBuilder::new().build(&make_run());
        assert!(manifest.terminal_hash.is_empty());
    }

    // ── Reproducibility ───────────────────────────────────────────────────────

    /// Same seed, same population: identical terminal hash.
    #[test]
    fn test_same_seed_same_fingerprint() {
        assert_eq!(generate_manifest_hash(42), generate_manifest_hash(42));
    }

    #[test]
    fn test_different_seed_different_fingerprint() {
        assert_ne!(generate_manifest_hash(42), generate_manifest_hash(43));
    }
}

//! Manifest construction and the in-memory `TableSink`.
//!
//! `ManifestBuilder` appends one chain entry per table and seals the chain
//! into a `DatasetManifest`. Any sink can embed one; the CSV directory sink
//! in the CLI does.
//!
//! `InMemoryTableSink` keeps every table and the chain behind a `Mutex`.
//! Use `manifest()` after the run completes and `verify_integrity()` at any
//! time to confirm nothing was altered in memory.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use medsynth_contracts::{
    error::{MedsynthError, MedsynthResult},
    run::RunInfo,
    table::Table,
};
use medsynth_core::traits::TableSink;

use crate::{
    chain::{hash_entry, hash_table, verify_tables},
    entry::{ChainEntry, DatasetManifest},
};

// ── Manifest builder ──────────────────────────────────────────────────────────

/// Append-only builder for one dataset's hash chain.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    entries: Vec<ChainEntry>,
    last_hash: String,
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestBuilder {
    /// An empty chain whose first entry will link to `GENESIS_HASH`.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            last_hash: ChainEntry::GENESIS_HASH.to_string(),
        }
    }

    /// Hash `table` and link it to the chain.
    pub fn append(&mut self, table: &Table) -> MedsynthResult<&ChainEntry> {
        let sequence = self.entries.len() as u64;
        let prev_hash = self.last_hash.clone();
        let content_hash = hash_table(table)?;
        let this_hash = hash_entry(&table.name, sequence, &prev_hash, &content_hash);

        debug!(table = %table.name, sequence, this_hash = %this_hash, "table chained");

        self.last_hash = this_hash.clone();
        self.entries.push(ChainEntry {
            sequence,
            table: table.name.clone(),
            row_count: table.rows.len(),
            content_hash,
            prev_hash,
            this_hash,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// Seal the chain into a manifest for `run`.
    pub fn build(&self, run: &RunInfo) -> DatasetManifest {
        DatasetManifest {
            run: run.clone(),
            tables: self.entries.clone(),
            terminal_hash: self.entries.last().map(|e| e.this_hash.clone()).unwrap_or_default(),
        }
    }
}

// ── In-memory sink ────────────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    pub(crate) tables: Vec<Table>,
    pub(crate) builder: ManifestBuilder,
    pub(crate) manifest: Option<DatasetManifest>,
}

/// A `TableSink` that keeps every table in memory alongside its hash chain.
pub struct InMemoryTableSink {
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl Default for InMemoryTableSink {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> MedsynthError {
    MedsynthError::OutputError {
        reason: format!("in-memory sink lock poisoned: {}", e),
    }
}

impl InMemoryTableSink {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState {
                tables: Vec::new(),
                builder: ManifestBuilder::new(),
                manifest: None,
            })),
        }
    }

    /// Every table written so far, in write order.
    pub fn tables(&self) -> MedsynthResult<Vec<Table>> {
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state.tables.clone())
    }

    /// The sealed manifest, once `finalize` has run.
    pub fn manifest(&self) -> MedsynthResult<Option<DatasetManifest>> {
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state.manifest.clone())
    }

    /// Check the chain and that every stored table still matches it.
    pub fn verify_integrity(&self) -> MedsynthResult<bool> {
        let state = self.state.lock().map_err(lock_error)?;
        verify_tables(state.builder.entries(), &state.tables)
    }
}

// ── TableSink impl ────────────────────────────────────────────────────────────

impl TableSink for InMemoryTableSink {
    fn write_table(&self, table: &Table) -> MedsynthResult<()> {
        let mut state = self.state.lock().map_err(lock_error)?;
        state.builder.append(table)?;
        state.tables.push(table.clone());
        Ok(())
    }

    fn finalize(&self, run: &RunInfo) -> MedsynthResult<()> {
        let mut state = self.state.lock().map_err(lock_error)?;
        let manifest = state.builder.build(run);

        info!(
            seed = run.seed,
            tables = manifest.tables.len(),
            terminal_hash = %manifest.terminal_hash,
            "dataset manifest sealed"
        );

        state.manifest = Some(manifest);
        Ok(())
    }
}

//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout for one entry (bytes, in order):
//!   1. table name as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. content_hash as UTF-8 bytes (64 ASCII hex chars)
//!
//! `content_hash` is SHA-256 over the canonical JSON of the table (name,
//! columns, rows), so every cell contributes to the chain.

use sha2::{Digest, Sha256};

use medsynth_contracts::{
    error::{MedsynthError, MedsynthResult},
    table::Table,
};

use crate::entry::ChainEntry;

/// SHA-256 of one table's canonical JSON, as lowercase hex.
pub fn hash_table(table: &Table) -> MedsynthResult<String> {
    let json = serde_json::to_vec(table).map_err(|e| MedsynthError::OutputError {
        reason: format!("failed to serialize table '{}': {}", table.name, e),
    })?;
    Ok(hex::encode(Sha256::digest(&json)))
}

/// Compute `this_hash` for one chain entry.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_entry(table: &str, sequence: u64, prev_hash: &str, content_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(table.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(content_hash.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify the integrity of a hash chain.
///
/// Returns `true` when the chain is valid according to three rules:
///
/// 1. **Sequence**: entry `i` carries sequence `i`.
/// 2. **Prev-hash linkage**: each `prev_hash` equals the preceding
///    entry's `this_hash` (or `GENESIS_HASH` for entry 0).
/// 3. **Hash correctness**: each `this_hash` matches the value recomputed
///    from the entry's own fields.
///
/// An empty chain is valid.
pub fn verify_chain(entries: &[ChainEntry]) -> bool {
    let mut expected_prev = ChainEntry::GENESIS_HASH.to_string();

    for (idx, entry) in entries.iter().enumerate() {
        if entry.sequence != idx as u64 || entry.prev_hash != expected_prev {
            return false;
        }

        let recomputed = hash_entry(&entry.table, entry.sequence, &entry.prev_hash, &entry.content_hash);
        if entry.this_hash != recomputed {
            return false;
        }

        expected_prev = entry.this_hash.clone();
    }

    true
}

/// Verify that `tables` are exactly the tables a chain was built from.
///
/// The chain must be intact and every table must match its entry by name,
/// row count, and content hash, in order.
pub fn verify_tables(entries: &[ChainEntry], tables: &[Table]) -> MedsynthResult<bool> {
    if !verify_chain(entries) || entries.len() != tables.len() {
        return Ok(false);
    }
    for (entry, table) in entries.iter().zip(tables) {
        if entry.table != table.name || entry.row_count != table.rows.len() {
            return Ok(false);
        }
        if entry.content_hash != hash_table(table)? {
            return Ok(false);
        }
    }
    Ok(true)
}

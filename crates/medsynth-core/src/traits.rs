//! Trait definitions at the edge of the generation pipeline.
//!
//! Generation itself is pure: the stages turn (config, catalog, seed) into
//! an in-memory `Dataset`. The only side effect is handing the rendered
//! tables to a `TableSink`, which decides where they go (a directory of CSV
//! files, an in-memory digest chain, ...). A `Verifier` checks a finished
//! dataset against its consistency rules.

use medsynth_contracts::{
    error::MedsynthResult,
    run::RunInfo,
    table::{Dataset, Table},
    verify::VerificationReport,
};

/// Destination for rendered tables.
///
/// The generator calls `write_table` once per table in the fixed table
/// order, then `finalize` exactly once. A failed write is fatal: the
/// generator stops and returns the error without calling `finalize`.
pub trait TableSink: Send + Sync {
    /// Persist one complete table.
    ///
    /// Tables are written whole; implementations never see a partial table.
    fn write_table(&self, table: &Table) -> MedsynthResult<()>;

    /// Mark the dataset as complete.
    ///
    /// Implementations may use this to flush buffers or write a manifest
    /// describing the run.
    fn finalize(&self, run: &RunInfo) -> MedsynthResult<()>;
}

/// Checks a generated dataset for consistency.
pub trait Verifier: Send + Sync {
    /// Run every rule over `dataset` and report all failures at once.
    ///
    /// A failing rule is reported in the returned report, not as `Err`;
    /// `Err` is reserved for the verifier itself being unable to run.
    fn verify(&self, dataset: &Dataset) -> MedsynthResult<VerificationReport>;
}

//! The four generation stages.
//!
//! Data flows Population → Assignment → {Pharmacy, Clinical}. Each stage is
//! a pure function of its inputs plus a per-patient random stream, so the
//! pharmacy and clinical stages can read the same assignment without
//! coordinating.

use chrono::{Duration, NaiveDate};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

use medsynth_contracts::ids::{NoteId, RxNumber, TransactionId};

pub mod assignment;
pub mod clinical;
pub mod pharmacy;
pub mod population;

/// Draw an index from non-negative `weights`.
///
/// Falls back to index 0 when the weights cannot form a distribution; the
/// catalog and config validators rule that out before generation starts.
pub(crate) fn weighted_index<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    WeightedIndex::new(weights)
        .map(|dist| dist.sample(rng))
        .unwrap_or(0)
}

/// `start` shifted by `days`, saturating at `start` on overflow.
pub(crate) fn add_days(start: NaiveDate, days: i64) -> NaiveDate {
    start.checked_add_signed(Duration::days(days)).unwrap_or(start)
}

/// A uniformly drawn date in `start..=end`.
pub(crate) fn date_between<R: Rng>(rng: &mut R, start: NaiveDate, end: NaiveDate) -> NaiveDate {
    let span = (end - start).num_days().max(0);
    add_days(start, rng.gen_range(0..=span))
}

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Counters for identifiers that are numbered across the whole dataset.
///
/// Per-patient generation draws from per-patient streams; only numbering
/// depends on patient order, so the pipeline walks patients in id order and
/// hands every stage the same `Sequences`.
#[derive(Debug, Default)]
pub struct Sequences {
    rx: u32,
    transaction: u32,
    note: u32,
}

impl Sequences {
    pub fn next_rx(&mut self) -> RxNumber {
        self.rx += 1;
        RxNumber(self.rx)
    }

    pub fn next_transaction(&mut self) -> TransactionId {
        self.transaction += 1;
        TransactionId(self.transaction)
    }

    pub fn next_note(&mut self) -> NoteId {
        self.note += 1;
        NoteId(self.note)
    }
}

//! Parameters that identify one generation run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Everything needed to reproduce a dataset given the same catalog.
///
/// Sinks receive this when the last table has been written so they can
/// record it next to the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub seed: u64,
    pub population_size: usize,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub reference_date: NaiveDate,
}

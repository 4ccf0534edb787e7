//! Observed versus expected condition prevalence.
//!
//! The expected fraction of a condition is the mean, over the generated
//! patients, of its clipped inclusion probability at each patient's age and
//! gender. With independent sampling the observed fraction converges on it,
//! so a large gap points at a sampling defect rather than bad luck.

use serde::{Deserialize, Serialize};
use tracing::warn;

use medsynth_catalog::Catalog;
use medsynth_contracts::table::Dataset;

/// Default absolute tolerance: five percentage points.
pub const DEFAULT_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionPrevalence {
    pub condition: String,
    pub patients: usize,
    pub observed: f64,
    pub expected: f64,
}

impl ConditionPrevalence {
    pub fn deviation(&self) -> f64 {
        (self.observed - self.expected).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrevalenceReport {
    pub population: usize,
    pub tolerance: f64,
    /// One row per catalog condition, in catalog order.
    pub conditions: Vec<ConditionPrevalence>,
}

impl PrevalenceReport {
    /// Conditions whose observed fraction is further than `tolerance` from
    /// the expected one.
    pub fn outliers(&self) -> impl Iterator<Item = &ConditionPrevalence> {
        self.conditions.iter().filter(move |c| c.deviation() > self.tolerance)
    }

    pub fn passed(&self) -> bool {
        self.outliers().next().is_none()
    }
}

/// Compare each catalog condition's observed fraction to its expected one.
///
/// An empty population yields zero for both fractions.
pub fn prevalence_report(dataset: &Dataset, catalog: &Catalog, tolerance: f64) -> PrevalenceReport {
    let population = dataset.patients.len();
    let denominator = population.max(1) as f64;

    let conditions: Vec<ConditionPrevalence> = catalog
        .conditions()
        .iter()
        .map(|spec| {
            let patients = dataset.patients.iter().filter(|p| p.has_condition(&spec.name)).count();
            let expected = dataset
                .patients
                .iter()
                .map(|p| spec.inclusion_probability(p.age, p.gender))
                .sum::<f64>()
                / denominator;
            ConditionPrevalence {
                condition: spec.name.clone(),
                patients,
                observed: patients as f64 / denominator,
                expected,
            }
        })
        .collect();

    let report = PrevalenceReport {
        population,
        tolerance,
        conditions,
    };
    for outlier in report.outliers() {
        warn!(
            condition = %outlier.condition,
            observed = outlier.observed,
            expected = outlier.expected,
            "prevalence outside tolerance"
        );
    }
    report
}

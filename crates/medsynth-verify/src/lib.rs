//! # medsynth-verify
//!
//! Consistency checking for generated medsynth datasets.
//!
//! This crate provides [`engine::DatasetVerifier`], which implements the
//! [`medsynth_core::traits::Verifier`] trait, and
//! [`prevalence::prevalence_report`], which compares observed condition
//! rates to the rates the catalog implies.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use medsynth_verify::engine::DatasetVerifier;
//!
//! let mut verifier = DatasetVerifier::new(catalog, config.reference_date);
//! verifier.register_rule("adult-only", Box::new(|dataset| {
//!     dataset
//!         .patients
//!         .iter()
//!         .filter(|p| p.age < 18)
//!         .map(|p| format!("{} is a minor", p.patient_id))
//!         .collect()
//! }));
//! let report = verifier.verify(&dataset)?;
//! ```

pub mod engine;
pub mod prevalence;

pub use engine::{rules, CustomRuleFn, DatasetVerifier};
pub use prevalence::{prevalence_report, ConditionPrevalence, PrevalenceReport, DEFAULT_TOLERANCE};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use medsynth_catalog::{Catalog, SimulationConfig};
    use medsynth_contracts::table::Dataset;
    use medsynth_core::Generator;

    use super::{prevalence_report, DEFAULT_TOLERANCE};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn generate(population_size: usize) -> (Dataset, Catalog) {
        let catalog = Catalog::default_catalog().unwrap();
        let config = SimulationConfig::default().with_overrides(Some(population_size), Some(42));
        let dataset = Generator::new(config, catalog.clone()).unwrap().generate();
        (dataset, catalog)
    }

    // ── Prevalence ────────────────────────────────────────────────────────────

    #[test]
    fn test_generated_prevalence_is_within_tolerance() {
        let (dataset, catalog) = generate(1000);
        let report = prevalence_report(&dataset, &catalog, DEFAULT_TOLERANCE);

        assert_eq!(report.population, 1000);
        assert_eq!(report.conditions.len(), catalog.conditions().len());
        let outliers: Vec<_> = report.outliers().map(|c| c.condition.clone()).collect();
        assert!(report.passed(), "conditions outside tolerance: {outliers:?}");
    }

    #[test]
    fn test_removed_condition_is_an_outlier() {
        let (mut dataset, catalog) = generate(300);
        for patient in &mut dataset.patients {
            patient.conditions.retain(|c| c != "Hypertension");
        }
        let report = prevalence_report(&dataset, &catalog, DEFAULT_TOLERANCE);

        assert!(!report.passed());
        let htn = report.outliers().find(|c| c.condition == "Hypertension").unwrap();
        assert_eq!(htn.patients, 0);
        assert!(htn.expected > 0.05, "hypertension should be common, expected {}", htn.expected);
    }

    #[test]
    fn test_empty_population_reports_zero() {
        let catalog = Catalog::default_catalog().unwrap();
        let report = prevalence_report(&Dataset::default(), &catalog, DEFAULT_TOLERANCE);
        assert_eq!(report.population, 0);
        assert!(report.conditions.iter().all(|c| c.observed == 0.0 && c.expected == 0.0));
        assert!(report.passed());
    }
}

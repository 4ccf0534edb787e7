//! # medsynth-catalog
//!
//! TOML-driven reference data and simulation parameters for medsynth.
//!
//! ## Overview
//!
//! [`Catalog`] holds the conditions, medications, lab panels, carriers,
//! reject codes, allergies, and immunization schedule.  A default catalog is
//! embedded in the crate; a replacement can be loaded from any TOML file
//! with the same schema.  [`SimulationConfig`] holds population size, seed,
//! simulation window, and every sampling rate.
//!
//! Both fail fast: a malformed or inconsistent document is rejected before
//! any generation starts.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use medsynth_catalog::{Catalog, SimulationConfig};
//!
//! let catalog = Catalog::default_catalog()?;
//! let config = SimulationConfig::from_file(Path::new("medsynth.toml"))?;
//! ```
//!
//! ## Age adjustment
//!
//! Each condition's age factor is a list of inclusive age bands tested in
//! declaration order; the first band containing the age wins, otherwise the
//! condition's `default` factor applies.

pub mod catalog;
pub mod config;
pub mod model;

pub use catalog::Catalog;
pub use config::{Bounds, ClinicalConfig, GenderWeights, PharmacyConfig, SimulationConfig};
pub use model::{
    AdultVaccine, AgeAdjustment, AgeBand, AgeBracket, AllergySpec, Carrier, CarrierProgram,
    CatalogConfig, ChildhoodVaccine, ConditionSpec, DosageForm, ImmunizationCatalog, LabComponent,
    Medication, RejectCode, VaccineSchedule,
};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use medsynth_contracts::{error::MedsynthError, patient::Gender};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// A minimal catalog: one condition, one medication, the two required
    /// government carriers, and one reject code.  `condition` is spliced in
    /// after the age pyramid.
    fn minimal_catalog(condition: &str) -> String {
        format!(
            r#"
            medications = [{{ name = "Metformin", ndc = "00093-7214-01" }}]
            carriers = [
                {{ name = "Medicare Part D", bin = "610455", pcn = "MEDICARE", group_prefix = "MD", program = "medicare" }},
                {{ name = "Medicaid", bin = "610014", pcn = "MEDICAID", group_prefix = "MC", program = "medicaid" }},
            ]
            reject_codes = [{{ code = "79", message = "Refill Too Soon" }}]

            [[age_distribution]]
            min_age = 18
            max_age = 90
            weight = 1.0

            {condition}

            [immunizations]
            childhood_routes = []
            childhood_sites = []
            childhood_manufacturers = []
            childhood = []
            adult = []
            "#
        )
    }

    const DIABETES: &str = r#"
        [[conditions]]
        name = "Type 2 Diabetes"
        icd10 = "E11.9"
        prevalence = 0.11
        medications = ["Metformin"]
        age_factor = { default = 0.3, bands = [{ min_age = 46, factor = 2.0 }] }
    "#;

    fn expect_catalog_error(toml: &str, needle: &str) {
        match Catalog::from_toml_str(toml) {
            Err(MedsynthError::CatalogError { reason }) => assert!(
                reason.contains(needle),
                "expected '{needle}' in reason, got: {reason}"
            ),
            other => panic!("expected CatalogError, got {:?}", other),
        }
    }

    // ── Default catalog ───────────────────────────────────────────────────────

    #[test]
    fn default_catalog_loads_all_twenty_one_conditions() {
        let catalog = Catalog::default_catalog().unwrap();
        assert_eq!(catalog.conditions().len(), 21);
        assert_eq!(catalog.reject_codes().len(), 9);
        assert_eq!(catalog.carriers().len(), 10);
        assert_eq!(catalog.age_distribution().len(), 9);
        assert_eq!(catalog.immunizations().childhood.len(), 6);
    }

    #[test]
    fn default_catalog_marks_rems_drugs() {
        let catalog = Catalog::default_catalog().unwrap();
        for rems in [
            "Hydrocodone/APAP",
            "Oxycodone/APAP",
            "Morphine Sulfate ER",
            "Tramadol",
            "Clozapine",
            "Isotretinoin",
            "Fingolimod",
        ] {
            assert!(catalog.is_rems(rems), "{rems} should be REMS");
        }
        assert!(!catalog.is_rems("Metformin"));
        assert!(!catalog.is_rems("Not A Drug"));
    }

    #[test]
    fn default_catalog_dosage_forms() {
        let catalog = Catalog::default_catalog().unwrap();
        assert_eq!(catalog.medication("Albuterol HFA").unwrap().form, DosageForm::Inhaler);
        assert_eq!(catalog.medication("Insulin Glargine").unwrap().form, DosageForm::Insulin);
        assert_eq!(catalog.medication("Adalimumab").unwrap().form, DosageForm::Injectable);
        assert_eq!(catalog.medication("Lisinopril").unwrap().form, DosageForm::Tablet);
        assert!(catalog.medication("Adalimumab").unwrap().is_specialty());
    }

    #[test]
    fn default_catalog_has_government_carriers() {
        let catalog = Catalog::default_catalog().unwrap();
        assert_eq!(
            catalog.carrier_for_program(CarrierProgram::Medicare).unwrap().name,
            "Medicare Part D"
        );
        assert_eq!(
            catalog.carrier_for_program(CarrierProgram::Medicaid).unwrap().name,
            "Medicaid"
        );
    }

    // ── Inclusion probability ─────────────────────────────────────────────────

    #[test]
    fn age_factor_first_matching_band_wins() {
        let catalog = Catalog::default_catalog().unwrap();
        let asthma = catalog.condition("Asthma").unwrap();
        assert_eq!(asthma.age_factor.factor(15), 1.2);
        assert_eq!(asthma.age_factor.factor(40), 1.0);
        assert_eq!(asthma.age_factor.factor(70), 1.2);

        let htn = catalog.condition("Hypertension").unwrap();
        assert_eq!(htn.age_factor.factor(45), 0.5);
        assert_eq!(htn.age_factor.factor(46), 1.5);
    }

    #[test]
    fn inclusion_probability_is_clipped_to_one() {
        let catalog = Catalog::default_catalog().unwrap();
        let bph = catalog.condition("Benign Prostatic Hyperplasia").unwrap();
        // 0.14 × 15 exceeds 1.
        assert_eq!(bph.inclusion_probability(70, Gender::Male), 1.0);
        assert_eq!(bph.inclusion_probability(40, Gender::Male), 0.0);
    }

    #[test]
    fn gender_restricted_condition_excludes_other_genders() {
        let catalog = Catalog::default_catalog().unwrap();
        let bph = catalog.condition("Benign Prostatic Hyperplasia").unwrap();
        assert_eq!(bph.inclusion_probability(70, Gender::Female), 0.0);
        assert_eq!(bph.inclusion_probability(70, Gender::Other), 0.0);

        let htn = catalog.condition("Hypertension").unwrap();
        let p = htn.inclusion_probability(60, Gender::Female);
        assert!((p - 0.29 * 1.5).abs() < 1e-12, "unexpected probability {p}");
    }

    // ── Catalog validation ────────────────────────────────────────────────────

    #[test]
    fn minimal_catalog_parses() {
        let catalog = Catalog::from_toml_str(&minimal_catalog(DIABETES)).unwrap();
        assert!(catalog.condition("Type 2 Diabetes").is_some());
        assert!(catalog.condition("Asthma").is_none());
    }

    #[test]
    fn unknown_medication_reference_is_rejected() {
        let toml = minimal_catalog(&DIABETES.replace("\"Metformin\"", "\"Glipizide\""));
        expect_catalog_error(&toml, "unknown medication 'Glipizide'");
    }

    #[test]
    fn prevalence_out_of_range_is_rejected() {
        let toml = minimal_catalog(&DIABETES.replace("0.11", "1.5"));
        expect_catalog_error(&toml, "prevalence must be in [0, 1]");
    }

    #[test]
    fn duplicate_condition_is_rejected() {
        let toml = minimal_catalog(&format!("{DIABETES}\n{DIABETES}"));
        expect_catalog_error(&toml, "duplicate condition 'Type 2 Diabetes'");
    }

    #[test]
    fn inverted_lab_range_is_rejected() {
        let condition = format!(
            "{DIABETES}\nlabs = [{{ panel = \"Hemoglobin A1C\", component = \"HbA1c\", low = 6.0, high = 4.0, unit = \"%\" }}]"
        );
        expect_catalog_error(&minimal_catalog(&condition), "invalid range");
    }

    #[test]
    fn missing_medicaid_carrier_is_rejected() {
        let toml = minimal_catalog(DIABETES).replace(", program = \"medicaid\"", "");
        expect_catalog_error(&toml, "Medicaid");
    }

    #[test]
    fn malformed_catalog_toml_is_rejected() {
        expect_catalog_error("conditions = 3", "failed to parse catalog TOML");
    }

    // ── Simulation config ─────────────────────────────────────────────────────

    #[test]
    fn empty_config_uses_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.population_size, 250);
        assert_eq!(config.seed, 42);
        assert_eq!(config.created_date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(config.pharmacy.rejection_rate, 0.15);
        assert_eq!(config.clinical.abnormal_rate(5), 0.20);
    }

    #[test]
    fn config_reads_dates_and_nested_tables() {
        let config = SimulationConfig::from_toml_str(
            r#"
            population_size = 1000
            window_start = "2023-06-01"
            window_end = "2025-06-01"

            [pharmacy]
            rejection_rate = 0.25
            medications_per_condition = { min = 1, max = 3 }
            "#,
        )
        .unwrap();
        assert_eq!(config.population_size, 1000);
        assert_eq!(config.window_days(), 731);
        assert_eq!(config.pharmacy.medications_per_condition, Bounds::new(1, 3));
        // Unspecified nested fields keep their defaults.
        assert_eq!(config.pharmacy.dosing_error_rate, 0.05);
    }

    #[test]
    fn zero_population_is_rejected() {
        match SimulationConfig::from_toml_str("population_size = 0") {
            Err(MedsynthError::ConfigError { reason }) => {
                assert!(reason.contains("population_size"), "unexpected reason: {reason}")
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        let err = SimulationConfig::from_toml_str("[pharmacy]\nrejection_rate = 1.2").unwrap_err();
        assert!(err.to_string().contains("pharmacy.rejection_rate"));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = SimulationConfig::from_toml_str(
            "window_start = \"2025-01-01\"\nwindow_end = \"2024-01-01\"",
        )
        .unwrap_err();
        assert!(err.to_string().contains("precedes window_start"));
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = SimulationConfig::default().with_overrides(Some(10), Some(7));
        assert_eq!(config.population_size, 10);
        assert_eq!(config.seed, 7);

        let untouched = SimulationConfig::default().with_overrides(None, None);
        assert_eq!(untouched, SimulationConfig::default());
        assert!(SimulationConfig::default().with_overrides(Some(0), None).validate().is_err());
    }
}

//! The medsynth generator: the seeded four-stage pipeline.
//!
//! The generator enforces the generation order:
//!
//!   Population → Assignment → Pharmacy → Clinical → Tables → Sink
//!
//! Each patient's conditions are fixed by the assignment stage before the
//! pharmacy and clinical stages read them, so both record systems agree on
//! one disease state. Patients are walked in id order; sequential
//! identifiers are therefore stable for a given seed and population size.

use tracing::{debug, info};

use medsynth_catalog::{Catalog, SimulationConfig};
use medsynth_contracts::{error::MedsynthResult, run::RunInfo, table::Dataset};

use crate::{
    stages::{
        assignment::assign,
        clinical::clinical_records,
        pharmacy::{insurance_profiles, pharmacy_records},
        population::generate_population,
        Sequences,
    },
    summary::DatasetSummary,
    traits::TableSink,
};

/// Drives one generation run over a validated config and catalog.
pub struct Generator {
    config: SimulationConfig,
    catalog: Catalog,
}

impl Generator {
    /// Create a generator, validating `config` first.
    ///
    /// The catalog validates itself on load.
    pub fn new(config: SimulationConfig, catalog: Catalog) -> MedsynthResult<Self> {
        config.validate()?;
        Ok(Self { config, catalog })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn run_info(&self) -> RunInfo {
        RunInfo {
            seed: self.config.seed,
            population_size: self.config.population_size,
            window_start: self.config.window_start,
            window_end: self.config.window_end,
            reference_date: self.config.reference_date,
        }
    }

    /// Build the whole dataset in memory.
    ///
    /// Pure: the result depends only on the config and catalog.
    pub fn generate(&self) -> Dataset {
        let config = &self.config;
        let catalog = &self.catalog;

        info!(
            population_size = config.population_size,
            seed = config.seed,
            window_start = %config.window_start,
            window_end = %config.window_end,
            "generation starting"
        );

        let mut dataset = Dataset::default();
        let mut sequences = Sequences::default();

        for mut patient in generate_population(config, catalog) {
            // ── Assignment: fixes the patient's conditions ───────────────────
            let assignment = assign(&patient, catalog, config);
            patient.conditions = assignment.conditions.clone();

            // ── Pharmacy: plans, fills, and claims against the primary ───────
            let insurance = insurance_profiles(&patient, catalog, config);
            if let Some(primary) = insurance.first() {
                let pharmacy = pharmacy_records(&patient, &assignment, primary, catalog, config, &mut sequences);
                dataset.prescriptions.extend(pharmacy.prescriptions);
                dataset.transactions.extend(pharmacy.transactions);
            }
            dataset.insurance.extend(insurance);

            // ── Clinical: diagnoses, labs, notes, immunizations ──────────────
            let clinical = clinical_records(&patient, &assignment, catalog, config, &mut sequences);
            dataset.diagnoses.extend(clinical.diagnoses);
            dataset.labs.extend(clinical.labs);
            dataset.clinical_notes.extend(clinical.notes);
            dataset.immunizations.extend(clinical.immunizations);

            dataset.patients.push(patient);
        }

        let summary = DatasetSummary::from_dataset(&dataset);
        info!(
            patients = summary.patients,
            prescriptions = summary.prescriptions,
            transactions = summary.transactions,
            diagnoses = summary.diagnoses,
            labs = summary.labs,
            notes = summary.clinical_notes,
            immunizations = summary.immunizations,
            "generation complete"
        );
        dataset
    }

    /// Generate the dataset and hand every table to `sink`, then finalize it.
    ///
    /// # Errors
    ///
    /// Returns the first sink error. `finalize` is not called after a failed
    /// write, so a sink never marks a partial dataset as complete.
    pub fn run(&self, sink: &dyn TableSink) -> MedsynthResult<Dataset> {
        let dataset = self.generate();

        for table in dataset.tables() {
            debug!(table = %table.name, rows = table.rows.len(), "writing table");
            sink.write_table(&table)?;
        }
        sink.finalize(&self.run_info())?;

        info!(seed = self.config.seed, "dataset written");
        Ok(dataset)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

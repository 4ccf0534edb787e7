//! Stage 2: condition assignment and medication regimens.
//!
//! Each catalog condition is sampled independently with
//! `p = clip(prevalence × age_factor(age), 0, 1)`. Comorbidity emerges from
//! the independent draws; no correlation model exists. Every assigned
//! condition then receives one or more distinct medications from its own
//! list.

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use medsynth_catalog::{Catalog, ConditionSpec, SimulationConfig};
use medsynth_contracts::patient::Patient;

use crate::rng::patient_rng;

pub const STREAM: &str = "assignment";

/// One medication prescribed for one assigned condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimenEntry {
    pub condition: String,
    pub medication: String,
}

/// The disease state of one patient, fixed for the rest of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Condition names in catalog order.
    pub conditions: Vec<String>,
    /// Regimen entries grouped by condition, in condition order.
    pub regimen: Vec<RegimenEntry>,
}

impl Assignment {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Medication names across the whole regimen, first occurrence order,
    /// without duplicates.
    pub fn medication_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for entry in &self.regimen {
            if !names.contains(&entry.medication.as_str()) {
                names.push(&entry.medication);
            }
        }
        names
    }
}

/// Assign conditions and a regimen to `patient` from its assignment stream.
pub fn assign(patient: &Patient, catalog: &Catalog, config: &SimulationConfig) -> Assignment {
    let mut rng = patient_rng(config.seed, STREAM, patient.patient_id);

    let mut conditions: Vec<&ConditionSpec> = catalog
        .conditions()
        .iter()
        .filter(|c| rng.gen::<f64>() < c.inclusion_probability(patient.age, patient.gender))
        .collect();

    if conditions.is_empty() && rng.gen::<f64>() < config.fallback_condition_rate {
        let eligible: Vec<&ConditionSpec> = catalog
            .conditions()
            .iter()
            .filter(|c| c.gender.map_or(true, |g| g == patient.gender))
            .collect();
        if let Some(&fallback) = eligible.choose(&mut rng) {
            conditions.push(fallback);
        }
    }

    let per_condition = config.pharmacy.medications_per_condition;
    let mut regimen = Vec::new();
    for condition in &conditions {
        let wanted = rng.gen_range(per_condition.min..=per_condition.max) as usize;
        let count = wanted.clamp(1, condition.medications.len());
        for medication in condition.medications.choose_multiple(&mut rng, count) {
            regimen.push(RegimenEntry {
                condition: condition.name.clone(),
                medication: medication.clone(),
            });
        }
    }

    debug!(
        patient_id = %patient.patient_id,
        conditions = conditions.len(),
        medications = regimen.len(),
        "conditions assigned"
    );

    Assignment {
        conditions: conditions.iter().map(|c| c.name.clone()).collect(),
        regimen,
    }
}

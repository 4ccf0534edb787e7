//! Headline counts for a generated dataset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use medsynth_contracts::{clinical::LabFlag, table::Dataset};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub patients: usize,
    pub patients_with_conditions: usize,
    pub insurance_profiles: usize,
    pub prescriptions: usize,
    pub rems_prescriptions: usize,
    pub dosing_errors: usize,
    pub transactions: usize,
    pub rejected_transactions: usize,
    pub diagnoses: usize,
    pub labs: usize,
    pub abnormal_labs: usize,
    pub clinical_notes: usize,
    /// Keyed by the rendered note type (`SOAP`, `Progress`, `Consultation`).
    pub notes_by_type: BTreeMap<String, usize>,
    pub immunizations: usize,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut notes_by_type = BTreeMap::new();
        for note in &dataset.clinical_notes {
            *notes_by_type.entry(note.note_type.to_string()).or_insert(0) += 1;
        }

        Self {
            patients: dataset.patients.len(),
            patients_with_conditions: dataset.patients.iter().filter(|p| !p.conditions.is_empty()).count(),
            insurance_profiles: dataset.insurance.len(),
            prescriptions: dataset.prescriptions.len(),
            rems_prescriptions: dataset.prescriptions.iter().filter(|rx| rx.is_rems).count(),
            dosing_errors: dataset.prescriptions.iter().filter(|rx| rx.dosing_error).count(),
            transactions: dataset.transactions.len(),
            rejected_transactions: dataset
                .transactions
                .iter()
                .filter(|txn| txn.adjudication.is_rejected())
                .count(),
            diagnoses: dataset.diagnoses.len(),
            labs: dataset.labs.len(),
            abnormal_labs: dataset
                .labs
                .iter()
                .filter(|lab| lab.flag == LabFlag::Abnormal)
                .count(),
            clinical_notes: dataset.clinical_notes.len(),
            notes_by_type,
            immunizations: dataset.immunizations.len(),
        }
    }

    /// Rejected share of transactions, in percent.
    pub fn reject_percent(&self) -> f64 {
        percent(self.rejected_transactions, self.transactions)
    }

    /// Abnormal share of lab results, in percent.
    pub fn abnormal_lab_percent(&self) -> f64 {
        percent(self.abnormal_labs, self.labs)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

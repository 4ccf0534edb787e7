//! EHR-system records: diagnoses, lab results, clinical notes, and
//! immunizations.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{NoteId, PatientId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosisStatus {
    Active,
    Resolved,
}

impl fmt::Display for DiagnosisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosisStatus::Active => "Active",
            DiagnosisStatus::Resolved => "Resolved",
        })
    }
}

/// A coded diagnosis mirroring one assigned condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub patient_id: PatientId,
    /// ICD-10-CM code from the catalog.
    pub diagnosis_code: String,
    /// The condition name.
    pub diagnosis_description: String,
    pub diagnosis_date: NaiveDate,
    pub status: DiagnosisStatus,
    pub is_chronic: bool,
    pub diagnosing_provider_npi: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabFlag {
    Normal,
    Abnormal,
}

impl fmt::Display for LabFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LabFlag::Normal => "Normal",
            LabFlag::Abnormal => "Abnormal",
        })
    }
}

/// One resulted component of a lab panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    pub patient_id: PatientId,
    pub order_date: NaiveDate,
    pub collection_date: NaiveDate,
    pub result_date: NaiveDate,
    /// Panel name, e.g. "Lipid Panel".
    pub test_name: String,
    /// Component name, e.g. "LDL".
    pub test_component: String,
    /// Rounded to two decimals.
    pub result_value: f64,
    pub unit: String,
    pub reference_low: f64,
    pub reference_high: f64,
    pub flag: LabFlag,
    pub ordering_provider_npi: String,
    pub performing_lab: String,
}

impl LabResult {
    /// Inclusive reference range rendered as `low-high`.
    pub fn reference_range(&self) -> String {
        format!("{}-{}", self.reference_low, self.reference_high)
    }

    pub fn within_reference_range(&self) -> bool {
        self.result_value >= self.reference_low && self.result_value <= self.reference_high
    }
}

/// Parse a `low-high` reference range back into its bounds.
pub fn parse_reference_range(range: &str) -> Option<(f64, f64)> {
    let (low, high) = range.split_once('-')?;
    Some((low.trim().parse().ok()?, high.trim().parse().ok()?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteType {
    Soap,
    Progress,
    Consultation,
}

impl NoteType {
    pub const ALL: [NoteType; 3] = [NoteType::Soap, NoteType::Progress, NoteType::Consultation];
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoteType::Soap => "SOAP",
            NoteType::Progress => "Progress",
            NoteType::Consultation => "Consultation",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub note_id: NoteId,
    pub patient_id: PatientId,
    pub note_date: NaiveDate,
    pub note_type: NoteType,
    /// Templated text; line breaks are the literal characters `\n`.
    pub note_text: String,
    pub author_npi: String,
    pub author_name: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Immunization {
    pub patient_id: PatientId,
    pub vaccine_name: String,
    pub cvx_code: String,
    pub administration_date: NaiveDate,
    pub dose_number: u32,
    pub route: String,
    pub site: String,
    pub lot_number: String,
    pub manufacturer: String,
    pub administered_by_npi: String,
}

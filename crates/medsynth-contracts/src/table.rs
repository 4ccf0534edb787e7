//! Tabular projection of the generated records.
//!
//! Column names and order are the interchange contract with the loaders
//! and queries downstream, so every schema is declared once here as a
//! constant and never assembled dynamically.

use serde::{Deserialize, Serialize};

use crate::{
    clinical::{ClinicalNote, Diagnosis, Immunization, LabResult},
    patient::Patient,
    pharmacy::{Adjudication, InsuranceProfile, InsuranceTransaction, Prescription},
};

/// Stable table names; each becomes `<name>.csv`.
pub mod names {
    pub const PHARMACY_PATIENTS: &str = "pharmacy_patients";
    pub const PHARMACY_INSURANCE: &str = "pharmacy_insurance";
    pub const PHARMACY_PRESCRIPTIONS: &str = "pharmacy_prescriptions";
    pub const PHARMACY_TRANSACTIONS: &str = "pharmacy_transactions";
    pub const EHR_PATIENTS: &str = "ehr_patients";
    pub const EHR_DIAGNOSES: &str = "ehr_diagnoses";
    pub const EHR_LABS: &str = "ehr_labs";
    pub const EHR_CLINICAL_NOTES: &str = "ehr_clinical_notes";
    pub const EHR_IMMUNIZATIONS: &str = "ehr_immunizations";
}

/// A fully rendered table: header plus string cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Render `records` under `name` using the record type's schema.
    pub fn from_records<R: TableRecord>(name: &str, records: impl IntoIterator<Item = R>) -> Self {
        Self {
            name: name.to_string(),
            columns: R::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: records.into_iter().map(|r| r.to_row()).collect(),
        }
    }

    /// Index of `column` in the header, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// All values of one column, in row order.
    pub fn column(&self, column: &str) -> Vec<&str> {
        match self.column_index(column) {
            Some(idx) => self.rows.iter().map(|r| r[idx].as_str()).collect(),
            None => Vec::new(),
        }
    }
}

/// A record type with a fixed column schema.
pub trait TableRecord {
    const COLUMNS: &'static [&'static str];

    fn to_row(&self) -> Vec<String>;
}

fn yes_no(flag: bool) -> String {
    let s = if flag { "Yes" } else { "No" };
    s.to_string()
}

fn joined_or(values: &[String], empty: &str) -> String {
    if values.is_empty() {
        empty.to_string()
    } else {
        values.join("|")
    }
}

fn date(d: chrono::NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// The pharmacy system's view of a patient, including clinical flags.
pub struct PharmacyPatientRow<'a>(pub &'a Patient);

impl TableRecord for PharmacyPatientRow<'_> {
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "first_name",
        "last_name",
        "date_of_birth",
        "age",
        "gender",
        "ssn",
        "phone",
        "email",
        "address",
        "city",
        "state",
        "zip_code",
        "conditions",
        "drug_allergies",
        "food_allergies",
        "created_date",
    ];

    fn to_row(&self) -> Vec<String> {
        let p = self.0;
        vec![
            p.patient_id.to_string(),
            p.first_name.clone(),
            p.last_name.clone(),
            date(p.date_of_birth),
            p.age.to_string(),
            p.gender.to_string(),
            p.ssn.clone(),
            p.phone.clone(),
            p.email.clone(),
            p.address.clone(),
            p.city.clone(),
            p.state.clone(),
            p.zip_code.clone(),
            joined_or(&p.conditions, "None"),
            joined_or(&p.drug_allergies, "NKDA"),
            joined_or(&p.food_allergies, "None"),
            date(p.created_date),
        ]
    }
}

/// The EHR's registration view of a patient (demographics only).
pub struct EhrPatientRow<'a>(pub &'a Patient);

impl TableRecord for EhrPatientRow<'_> {
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "first_name",
        "last_name",
        "date_of_birth",
        "age",
        "gender",
        "ssn",
        "phone",
        "email",
        "address",
        "city",
        "state",
        "zip_code",
        "created_date",
    ];

    fn to_row(&self) -> Vec<String> {
        let p = self.0;
        vec![
            p.patient_id.to_string(),
            p.first_name.clone(),
            p.last_name.clone(),
            date(p.date_of_birth),
            p.age.to_string(),
            p.gender.to_string(),
            p.ssn.clone(),
            p.phone.clone(),
            p.email.clone(),
            p.address.clone(),
            p.city.clone(),
            p.state.clone(),
            p.zip_code.clone(),
            date(p.created_date),
        ]
    }
}

impl TableRecord for &InsuranceProfile {
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "insurance_rank",
        "carrier_name",
        "rx_bin",
        "rx_pcn",
        "rx_group",
        "cardholder_id",
        "person_code",
        "effective_date",
        "termination_date",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.patient_id.to_string(),
            self.rank.to_string(),
            self.carrier_name.clone(),
            self.rx_bin.clone(),
            self.rx_pcn.clone(),
            self.rx_group.clone(),
            self.cardholder_id.clone(),
            format!("{:02}", self.person_code),
            date(self.effective_date),
            self.termination_date.map(date).unwrap_or_default(),
        ]
    }
}

impl TableRecord for &Prescription {
    const COLUMNS: &'static [&'static str] = &[
        "rx_number",
        "patient_id",
        "medication_name",
        "ndc",
        "quantity",
        "days_supply",
        "written_date",
        "fill_date",
        "refill_number",
        "sig",
        "prescriber_npi",
        "copay",
        "condition",
        "is_rems",
        "dosing_error",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.rx_number.to_string(),
            self.patient_id.to_string(),
            self.medication_name.clone(),
            self.ndc.clone(),
            self.quantity.to_string(),
            self.days_supply.to_string(),
            date(self.written_date),
            date(self.fill_date),
            self.refill_number.to_string(),
            self.sig.clone(),
            self.prescriber_npi.clone(),
            self.copay.to_string(),
            self.condition.clone(),
            yes_no(self.is_rems),
            yes_no(self.dosing_error),
        ]
    }
}

impl TableRecord for &InsuranceTransaction {
    const COLUMNS: &'static [&'static str] = &[
        "transaction_id",
        "rx_number",
        "patient_id",
        "fill_date",
        "rx_bin",
        "rx_pcn",
        "rx_group",
        "cardholder_id",
        "ndc",
        "quantity",
        "days_supply",
        "submitted_amount",
        "paid_amount",
        "patient_pay",
        "status",
        "reject_code",
        "reject_message",
        "submission_clarification_code",
        "transaction_timestamp",
    ];

    fn to_row(&self) -> Vec<String> {
        let (reject_code, reject_message) = match &self.adjudication {
            Adjudication::Approved => (String::new(), String::new()),
            Adjudication::Rejected { code, message } => (code.clone(), message.clone()),
        };
        vec![
            self.transaction_id.to_string(),
            self.rx_number.to_string(),
            self.patient_id.to_string(),
            date(self.fill_date),
            self.rx_bin.clone(),
            self.rx_pcn.clone(),
            self.rx_group.clone(),
            self.cardholder_id.clone(),
            self.ndc.clone(),
            self.quantity.to_string(),
            self.days_supply.to_string(),
            self.submitted_amount.to_string(),
            self.paid_amount.to_string(),
            self.patient_pay.to_string(),
            self.adjudication.status().to_string(),
            reject_code,
            reject_message,
            self.submission_clarification_code.clone().unwrap_or_default(),
            self.transaction_timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
        ]
    }
}

impl TableRecord for &Diagnosis {
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "diagnosis_code",
        "diagnosis_description",
        "diagnosis_date",
        "status",
        "is_chronic",
        "diagnosing_provider_npi",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.patient_id.to_string(),
            self.diagnosis_code.clone(),
            self.diagnosis_description.clone(),
            date(self.diagnosis_date),
            self.status.to_string(),
            yes_no(self.is_chronic),
            self.diagnosing_provider_npi.clone(),
        ]
    }
}

impl TableRecord for &LabResult {
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "order_date",
        "collection_date",
        "result_date",
        "test_name",
        "test_component",
        "result_value",
        "unit",
        "reference_range",
        "flag",
        "ordering_provider_npi",
        "performing_lab",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.patient_id.to_string(),
            date(self.order_date),
            date(self.collection_date),
            date(self.result_date),
            self.test_name.clone(),
            self.test_component.clone(),
            format!("{:.2}", self.result_value),
            self.unit.clone(),
            self.reference_range(),
            self.flag.to_string(),
            self.ordering_provider_npi.clone(),
            self.performing_lab.clone(),
        ]
    }
}

impl TableRecord for &ClinicalNote {
    const COLUMNS: &'static [&'static str] = &[
        "note_id",
        "patient_id",
        "note_date",
        "note_type",
        "note_text",
        "author_npi",
        "author_name",
        "department",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.note_id.to_string(),
            self.patient_id.to_string(),
            date(self.note_date),
            self.note_type.to_string(),
            self.note_text.clone(),
            self.author_npi.clone(),
            self.author_name.clone(),
            self.department.clone(),
        ]
    }
}

impl TableRecord for &Immunization {
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "vaccine_name",
        "cvx_code",
        "administration_date",
        "dose_number",
        "route",
        "site",
        "lot_number",
        "manufacturer",
        "administered_by_npi",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.patient_id.to_string(),
            self.vaccine_name.clone(),
            self.cvx_code.clone(),
            date(self.administration_date),
            self.dose_number.to_string(),
            self.route.clone(),
            self.site.clone(),
            self.lot_number.clone(),
            self.manufacturer.clone(),
            self.administered_by_npi.clone(),
        ]
    }
}

/// Everything one run produces, before serialization.
///
/// Both record systems are projections of this single structure, which is
/// what keeps them consistent with each other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub patients: Vec<Patient>,
    pub insurance: Vec<InsuranceProfile>,
    pub prescriptions: Vec<Prescription>,
    pub transactions: Vec<InsuranceTransaction>,
    pub diagnoses: Vec<Diagnosis>,
    pub labs: Vec<LabResult>,
    pub clinical_notes: Vec<ClinicalNote>,
    pub immunizations: Vec<Immunization>,
}

impl Dataset {
    /// Render all nine output tables, pharmacy system first.
    pub fn tables(&self) -> Vec<Table> {
        vec![
            Table::from_records(
                names::PHARMACY_PATIENTS,
                self.patients.iter().map(PharmacyPatientRow),
            ),
            Table::from_records(names::PHARMACY_INSURANCE, self.insurance.iter()),
            Table::from_records(names::PHARMACY_PRESCRIPTIONS, self.prescriptions.iter()),
            Table::from_records(names::PHARMACY_TRANSACTIONS, self.transactions.iter()),
            Table::from_records(names::EHR_PATIENTS, self.patients.iter().map(EhrPatientRow)),
            Table::from_records(names::EHR_DIAGNOSES, self.diagnoses.iter()),
            Table::from_records(names::EHR_LABS, self.labs.iter()),
            Table::from_records(names::EHR_CLINICAL_NOTES, self.clinical_notes.iter()),
            Table::from_records(names::EHR_IMMUNIZATIONS, self.immunizations.iter()),
        ]
    }
}

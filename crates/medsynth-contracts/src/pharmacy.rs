//! Pharmacy-system records: insurance profiles, prescription fills, and
//! adjudication transactions.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::ids::{Cents, PatientId, RxNumber, TransactionId};

/// Coordination-of-benefits order of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InsuranceRank {
    Primary,
    Secondary,
    Tertiary,
}

impl InsuranceRank {
    pub const ALL: [InsuranceRank; 3] = [
        InsuranceRank::Primary,
        InsuranceRank::Secondary,
        InsuranceRank::Tertiary,
    ];
}

impl fmt::Display for InsuranceRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InsuranceRank::Primary => "Primary",
            InsuranceRank::Secondary => "Secondary",
            InsuranceRank::Tertiary => "Tertiary",
        };
        f.write_str(s)
    }
}

/// One pharmacy benefit plan held by a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceProfile {
    pub patient_id: PatientId,
    pub rank: InsuranceRank,
    pub carrier_name: String,
    pub rx_bin: String,
    pub rx_pcn: String,
    pub rx_group: String,
    pub cardholder_id: String,
    /// 1..=4, rendered as two digits.
    pub person_code: u8,
    pub effective_date: NaiveDate,
    pub termination_date: Option<NaiveDate>,
}

/// One fill of a prescription lineage.
///
/// The original fill has `refill_number == 0`; refills share the
/// `rx_number`, `written_date`, and dosing of the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub rx_number: RxNumber,
    pub patient_id: PatientId,
    pub medication_name: String,
    pub ndc: String,
    pub quantity: u32,
    pub days_supply: u32,
    pub written_date: NaiveDate,
    pub fill_date: NaiveDate,
    pub refill_number: u32,
    pub sig: String,
    pub prescriber_npi: String,
    pub copay: Cents,
    /// The assigned condition this medication treats.
    pub condition: String,
    pub is_rems: bool,
    /// Marks a deliberately implausible quantity or days supply.
    pub dosing_error: bool,
}

/// Outcome of submitting a claim to the primary plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjudication {
    Approved,
    Rejected { code: String, message: String },
}

impl Adjudication {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Adjudication::Rejected { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            Adjudication::Approved => "Approved",
            Adjudication::Rejected { .. } => "Rejected",
        }
    }
}

/// One claim submission for one prescription fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceTransaction {
    pub transaction_id: TransactionId,
    pub rx_number: RxNumber,
    pub patient_id: PatientId,
    pub fill_date: NaiveDate,
    pub rx_bin: String,
    pub rx_pcn: String,
    pub rx_group: String,
    pub cardholder_id: String,
    pub ndc: String,
    pub quantity: u32,
    pub days_supply: u32,
    pub submitted_amount: Cents,
    /// Zero for rejected claims.
    pub paid_amount: Cents,
    /// Zero for rejected claims; otherwise `submitted - paid`.
    pub patient_pay: Cents,
    pub adjudication: Adjudication,
    pub submission_clarification_code: Option<String>,
    pub transaction_timestamp: NaiveDateTime,
}

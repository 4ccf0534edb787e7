//! The shared patient identity referenced by both record systems.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ids::PatientId;

/// Administrative gender as recorded at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    /// Any category outside the binary split.
    Other,
}

impl Gender {
    /// Single-letter code used in the output tables.
    pub fn code(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "X",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One synthetic patient.
///
/// Built by the population stage with an empty `conditions` list; the
/// assignment stage fills `conditions` exactly once and every later stage
/// only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: PatientId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// Completed years at the simulation reference date.
    pub age: u32,
    pub gender: Gender,
    /// Formatted `AAA-GG-SSSS`; structurally valid, never a real number.
    pub ssn: String,
    /// Formatted `(AAA) EEE-NNNN`.
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    /// Catalog condition names in catalog order.
    pub conditions: Vec<String>,
    pub drug_allergies: Vec<String>,
    pub food_allergies: Vec<String>,
    pub created_date: NaiveDate,
}

impl Patient {
    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.iter().any(|c| c == name)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Completed years between `date_of_birth` and `as_of`.
///
/// Returns 0 when `as_of` precedes the birth date.
pub fn age_on(date_of_birth: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of < date_of_birth {
        return 0;
    }
    let mut years = as_of.year() - date_of_birth.year();
    if (as_of.month(), as_of.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

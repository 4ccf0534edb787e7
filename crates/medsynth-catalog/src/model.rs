//! Catalog schema as deserialized from TOML.
//!
//! A `CatalogConfig` holds the static reference data every generation stage
//! reads: the age pyramid, the condition list with age-adjusted prevalence,
//! medication metadata, pharmacy benefit carriers, reject codes, allergies,
//! and the immunization schedule.  Nothing here is validated; see
//! [`Catalog`](crate::catalog::Catalog) for the checked, indexed form.

use serde::{Deserialize, Serialize};

use medsynth_contracts::patient::Gender;

/// One bracket of the target age pyramid.
///
/// Brackets are picked by relative `weight`; the exact age is then drawn
/// uniformly from `min_age..=max_age`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBracket {
    pub min_age: u32,
    pub max_age: u32,
    pub weight: f64,
}

/// An inclusive age band carrying a prevalence multiplier.
///
/// An absent bound is open on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBand {
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    pub factor: f64,
}

impl AgeBand {
    pub fn matches(&self, age: u32) -> bool {
        self.min_age.map_or(true, |min| age >= min) && self.max_age.map_or(true, |max| age <= max)
    }
}

/// Age-adjustment function of a condition.
///
/// Bands are tested in declaration order; the first band containing the age
/// supplies the factor.  If none matches, `default` applies.
///
/// ```toml
/// age_factor = { default = 0.5, bands = [{ min_age = 46, factor = 1.5 }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeAdjustment {
    #[serde(rename = "default", default = "unit_factor")]
    pub default_factor: f64,
    #[serde(default)]
    pub bands: Vec<AgeBand>,
}

fn unit_factor() -> f64 {
    1.0
}

impl Default for AgeAdjustment {
    fn default() -> Self {
        Self {
            default_factor: unit_factor(),
            bands: Vec::new(),
        }
    }
}

impl AgeAdjustment {
    pub fn factor(&self, age: u32) -> f64 {
        self.bands
            .iter()
            .find(|band| band.matches(age))
            .map_or(self.default_factor, |band| band.factor)
    }
}

/// One component of a lab panel ordered for a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabComponent {
    pub panel: String,
    pub component: String,
    pub low: f64,
    pub high: f64,
    #[serde(default)]
    pub unit: String,
}

/// A named disease state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub name: String,
    /// ICD-10-CM code written to the diagnoses table.
    pub icd10: String,
    /// Base prevalence before age adjustment, in [0, 1].
    pub prevalence: f64,
    #[serde(default)]
    pub age_factor: AgeAdjustment,
    /// Restricts the condition to one gender when set.
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub chronic: bool,
    /// Maintenance therapy refills up to the long refill cap.
    #[serde(default)]
    pub maintenance: bool,
    /// Medication names; each must exist in the medication table.
    pub medications: Vec<String>,
    #[serde(default)]
    pub labs: Vec<LabComponent>,
}

impl ConditionSpec {
    /// `clip(prevalence × age_factor(age), 0, 1)`, or 0 when the condition
    /// is restricted to another gender.
    pub fn inclusion_probability(&self, age: u32, gender: Gender) -> f64 {
        if self.gender.is_some_and(|g| g != gender) {
            return 0.0;
        }
        (self.prevalence * self.age_factor.factor(age)).clamp(0.0, 1.0)
    }
}

/// Physical dosage form; drives quantity, days supply, and sig.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DosageForm {
    #[default]
    Tablet,
    Inhaler,
    Insulin,
    Injectable,
}

/// Static metadata for one medication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub ndc: String,
    #[serde(default)]
    pub form: DosageForm,
    /// Risk Evaluation and Mitigation Strategy drug.
    #[serde(default)]
    pub rems: bool,
}

impl Medication {
    /// REMS drugs and injectables bill on the specialty copay tier.
    pub fn is_specialty(&self) -> bool {
        self.rems || self.form == DosageForm::Injectable
    }
}

/// Government program a carrier administers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CarrierProgram {
    Medicare,
    Medicaid,
}

/// A pharmacy benefit carrier and its routing identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub name: String,
    pub bin: String,
    pub pcn: String,
    /// Group numbers are this prefix followed by five digits.
    pub group_prefix: String,
    #[serde(default)]
    pub program: Option<CarrierProgram>,
}

/// An NCPDP reject reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectCode {
    pub code: String,
    pub message: String,
}

/// An allergy sampled independently at `prevalence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllergySpec {
    pub name: String,
    pub prevalence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildhoodVaccine {
    pub vaccine_name: String,
    pub cvx_code: String,
}

/// How often an adult vaccine recurs inside the simulation window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VaccineSchedule {
    /// At most one administration in the window.
    #[default]
    Once,
    /// One administration per flu season (September to November).
    Seasonal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdultVaccine {
    pub vaccine_name: String,
    pub cvx_code: String,
    /// Fraction of eligible patients who receive it.
    pub coverage: f64,
    #[serde(default)]
    pub min_age: u32,
    #[serde(default)]
    pub schedule: VaccineSchedule,
    /// Dose numbers are drawn from `1..=max_dose`.
    #[serde(default = "single_dose")]
    pub max_dose: u32,
    pub lot_prefix: String,
    pub manufacturers: Vec<String>,
    #[serde(default = "intramuscular")]
    pub route: String,
    #[serde(default = "left_deltoid")]
    pub site: String,
}

fn single_dose() -> u32 {
    1
}

fn intramuscular() -> String {
    "Intramuscular".to_string()
}

fn left_deltoid() -> String {
    "Left deltoid".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmunizationCatalog {
    pub childhood_routes: Vec<String>,
    pub childhood_sites: Vec<String>,
    pub childhood_manufacturers: Vec<String>,
    pub childhood: Vec<ChildhoodVaccine>,
    pub adult: Vec<AdultVaccine>,
}

/// The top-level structure deserialized from a catalog TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub age_distribution: Vec<AgeBracket>,
    pub conditions: Vec<ConditionSpec>,
    pub medications: Vec<Medication>,
    pub carriers: Vec<Carrier>,
    pub reject_codes: Vec<RejectCode>,
    #[serde(default)]
    pub drug_allergies: Vec<AllergySpec>,
    #[serde(default)]
    pub food_allergies: Vec<AllergySpec>,
    pub immunizations: ImmunizationCatalog,
}

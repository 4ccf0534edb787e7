//! Validated, indexed catalog.
//!
//! `Catalog` wraps a `CatalogConfig` after checking it for internal
//! consistency and builds name indices for the lookups every generation
//! stage performs.
//!
//! Validation covers:
//!
//! 1. Every probability (prevalence, allergy rate, vaccine coverage) lies in
//!    [0, 1] and every age factor is finite and non-negative.
//! 2. Condition and medication names are unique and every medication a
//!    condition lists exists in the medication table.
//! 3. Lab components have `low <= high`.
//! 4. The carrier list holds a Medicare and a Medicaid carrier, and at least
//!    one reject code exists.
//! 5. The age pyramid is non-empty with ordered brackets and a positive
//!    total weight.

use std::{collections::HashMap, path::Path};

use tracing::{debug, info};

use medsynth_contracts::error::{MedsynthError, MedsynthResult};

use crate::model::{
    AdultVaccine, AgeBracket, AllergySpec, Carrier, CarrierProgram, CatalogConfig, ConditionSpec,
    ImmunizationCatalog, Medication, RejectCode,
};

const DEFAULT_CATALOG: &str = include_str!("../catalog/default.toml");

/// Read-only reference data shared by every generation stage.
///
/// ```rust,ignore
/// use medsynth_catalog::Catalog;
///
/// let catalog = Catalog::from_file(Path::new("catalog/custom.toml"))?;
/// let htn = catalog.condition("Hypertension");
/// ```
#[derive(Debug, Clone)]
pub struct Catalog {
    config: CatalogConfig,
    condition_index: HashMap<String, usize>,
    medication_index: HashMap<String, usize>,
}

impl Catalog {
    /// The catalog embedded in the crate: 21 conditions with their
    /// medications, lab panels, carriers, reject codes, allergies, and the
    /// immunization schedule.
    pub fn default_catalog() -> MedsynthResult<Self> {
        Self::from_toml_str(DEFAULT_CATALOG)
    }

    /// Parse `s` as TOML and validate it.
    ///
    /// Returns `MedsynthError::CatalogError` if the TOML is malformed or the
    /// catalog is inconsistent.
    pub fn from_toml_str(s: &str) -> MedsynthResult<Self> {
        let config: CatalogConfig = toml::from_str(s).map_err(|e| MedsynthError::CatalogError {
            reason: format!("failed to parse catalog TOML: {}", e),
        })?;
        Self::from_config(config)
    }

    /// Read the file at `path` and parse it as a catalog.
    pub fn from_file(path: &Path) -> MedsynthResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MedsynthError::CatalogError {
            reason: format!("failed to read catalog file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Validate an already-deserialized catalog and index it.
    pub fn from_config(config: CatalogConfig) -> MedsynthResult<Self> {
        let medication_index = index_unique("medication", config.medications.iter().map(|m| &m.name))?;
        let condition_index = index_unique("condition", config.conditions.iter().map(|c| &c.name))?;

        validate_age_distribution(&config.age_distribution)?;
        for condition in &config.conditions {
            validate_condition(condition, &medication_index)?;
        }
        for medication in &config.medications {
            if medication.ndc.trim().is_empty() {
                return Err(catalog_error(format!("medication '{}' has an empty NDC", medication.name)));
            }
        }
        validate_carriers(&config.carriers)?;
        if config.reject_codes.is_empty() {
            return Err(catalog_error("at least one reject code is required"));
        }
        for allergy in config.drug_allergies.iter().chain(&config.food_allergies) {
            check_probability(&format!("allergy '{}' prevalence", allergy.name), allergy.prevalence)?;
        }
        validate_immunizations(&config.immunizations)?;

        info!(
            conditions = config.conditions.len(),
            medications = config.medications.len(),
            carriers = config.carriers.len(),
            "catalog loaded"
        );

        Ok(Self {
            config,
            condition_index,
            medication_index,
        })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn age_distribution(&self) -> &[AgeBracket] {
        &self.config.age_distribution
    }

    /// Conditions in declaration order.
    pub fn conditions(&self) -> &[ConditionSpec] {
        &self.config.conditions
    }

    pub fn condition(&self, name: &str) -> Option<&ConditionSpec> {
        self.condition_index.get(name).map(|&i| &self.config.conditions[i])
    }

    pub fn medications(&self) -> &[Medication] {
        &self.config.medications
    }

    pub fn medication(&self, name: &str) -> Option<&Medication> {
        self.medication_index.get(name).map(|&i| &self.config.medications[i])
    }

    /// REMS status of a medication; unknown names are not REMS.
    pub fn is_rems(&self, medication: &str) -> bool {
        self.medication(medication).is_some_and(|m| m.rems)
    }

    pub fn carriers(&self) -> &[Carrier] {
        &self.config.carriers
    }

    /// The carrier administering `program`. Validation guarantees one exists.
    pub fn carrier_for_program(&self, program: CarrierProgram) -> Option<&Carrier> {
        self.config.carriers.iter().find(|c| c.program == Some(program))
    }

    pub fn reject_codes(&self) -> &[RejectCode] {
        &self.config.reject_codes
    }

    pub fn drug_allergies(&self) -> &[AllergySpec] {
        &self.config.drug_allergies
    }

    pub fn food_allergies(&self) -> &[AllergySpec] {
        &self.config.food_allergies
    }

    pub fn immunizations(&self) -> &ImmunizationCatalog {
        &self.config.immunizations
    }
}

// ── Validation helpers ───────────────────────────────────────────────────────

fn catalog_error(reason: impl Into<String>) -> MedsynthError {
    MedsynthError::CatalogError { reason: reason.into() }
}

fn check_probability(what: &str, value: f64) -> MedsynthResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(catalog_error(format!("{} must be in [0, 1], got {}", what, value)))
    }
}

fn index_unique<'a>(
    kind: &str,
    names: impl Iterator<Item = &'a String>,
) -> MedsynthResult<HashMap<String, usize>> {
    let mut index = HashMap::new();
    for (i, name) in names.enumerate() {
        if index.insert(name.clone(), i).is_some() {
            return Err(catalog_error(format!("duplicate {} '{}'", kind, name)));
        }
    }
    if index.is_empty() {
        return Err(catalog_error(format!("at least one {} is required", kind)));
    }
    Ok(index)
}

fn validate_age_distribution(brackets: &[AgeBracket]) -> MedsynthResult<()> {
    if brackets.is_empty() {
        return Err(catalog_error("age_distribution must not be empty"));
    }
    let mut total = 0.0;
    for bracket in brackets {
        if bracket.min_age > bracket.max_age {
            return Err(catalog_error(format!(
                "age bracket {}-{} has min_age above max_age",
                bracket.min_age, bracket.max_age
            )));
        }
        if !bracket.weight.is_finite() || bracket.weight < 0.0 {
            return Err(catalog_error(format!(
                "age bracket {}-{} has invalid weight {}",
                bracket.min_age, bracket.max_age, bracket.weight
            )));
        }
        total += bracket.weight;
    }
    if total <= 0.0 {
        return Err(catalog_error("age_distribution weights must sum to a positive value"));
    }
    Ok(())
}

fn validate_condition(condition: &ConditionSpec, medications: &HashMap<String, usize>) -> MedsynthResult<()> {
    check_probability(&format!("condition '{}' prevalence", condition.name), condition.prevalence)?;

    let factors = std::iter::once(condition.age_factor.default_factor)
        .chain(condition.age_factor.bands.iter().map(|b| b.factor));
    for factor in factors {
        if !factor.is_finite() || factor < 0.0 {
            return Err(catalog_error(format!(
                "condition '{}' has invalid age factor {}",
                condition.name, factor
            )));
        }
    }

    if condition.medications.is_empty() {
        return Err(catalog_error(format!("condition '{}' lists no medications", condition.name)));
    }
    for medication in &condition.medications {
        if !medications.contains_key(medication) {
            return Err(catalog_error(format!(
                "condition '{}' references unknown medication '{}'",
                condition.name, medication
            )));
        }
    }

    for lab in &condition.labs {
        if !(lab.low.is_finite() && lab.high.is_finite()) || lab.low > lab.high {
            return Err(catalog_error(format!(
                "lab '{}' for condition '{}' has invalid range {}-{}",
                lab.component, condition.name, lab.low, lab.high
            )));
        }
    }

    debug!(
        condition = %condition.name,
        medications = condition.medications.len(),
        labs = condition.labs.len(),
        "condition validated"
    );
    Ok(())
}

fn validate_carriers(carriers: &[Carrier]) -> MedsynthResult<()> {
    if carriers.is_empty() {
        return Err(catalog_error("at least one carrier is required"));
    }
    for program in [CarrierProgram::Medicare, CarrierProgram::Medicaid] {
        if !carriers.iter().any(|c| c.program == Some(program)) {
            return Err(catalog_error(format!("no carrier is marked with program {:?}", program)));
        }
    }
    Ok(())
}

fn validate_adult_vaccine(vaccine: &AdultVaccine) -> MedsynthResult<()> {
    check_probability(&format!("vaccine '{}' coverage", vaccine.vaccine_name), vaccine.coverage)?;
    if vaccine.max_dose == 0 {
        return Err(catalog_error(format!("vaccine '{}' has max_dose 0", vaccine.vaccine_name)));
    }
    if vaccine.manufacturers.is_empty() {
        return Err(catalog_error(format!("vaccine '{}' lists no manufacturers", vaccine.vaccine_name)));
    }
    Ok(())
}

fn validate_immunizations(immunizations: &ImmunizationCatalog) -> MedsynthResult<()> {
    if !immunizations.childhood.is_empty()
        && (immunizations.childhood_routes.is_empty()
            || immunizations.childhood_sites.is_empty()
            || immunizations.childhood_manufacturers.is_empty())
    {
        return Err(catalog_error(
            "childhood vaccines require non-empty routes, sites and manufacturers",
        ));
    }
    for vaccine in &immunizations.adult {
        validate_adult_vaccine(vaccine)?;
    }
    Ok(())
}

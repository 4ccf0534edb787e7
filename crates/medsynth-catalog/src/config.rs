//! Simulation configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//! Dates are quoted ISO strings:
//!
//! ```toml
//! population_size = 1000
//! seed = 7
//! window_start = "2024-01-01"
//! window_end = "2026-01-27"
//!
//! [pharmacy]
//! rejection_rate = 0.10
//! medications_per_condition = { min = 1, max = 3 }
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use medsynth_contracts::error::{MedsynthError, MedsynthResult};

/// Inclusive `min..=max` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd> Bounds<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

/// Relative weights of the three recorded gender codes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderWeights {
    pub male: f64,
    pub female: f64,
    pub other: f64,
}

impl Default for GenderWeights {
    fn default() -> Self {
        Self {
            male: 0.45,
            female: 0.45,
            other: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PharmacyConfig {
    /// Probability a claim is rejected.
    pub rejection_rate: f64,
    /// Probability a prescription lineage carries implausible dosing.
    ///
    /// Drawn once per original fill, independently across lineages. Refills
    /// repeat the original's quantity and days supply, so they inherit its
    /// flag and the row-level fraction sits slightly below this rate.
    pub dosing_error_rate: f64,
    pub medications_per_condition: Bounds<u32>,
    /// Upper bound on the gap between written and first fill.
    pub max_fill_delay_days: u32,
    /// Added to days supply between consecutive fills.
    pub adherence_gap_days: Bounds<i64>,
    pub maintenance_refill_cap: u32,
    /// Non-maintenance lineages draw their cap from `0..=acute_refill_cap`.
    pub acute_refill_cap: u32,
    /// Probability an under-65 patient's primary plan is Medicaid.
    pub medicaid_rate: f64,
    /// Relative weights of holding one, two, or three plans.
    pub plan_count_weights: [f64; 3],
    /// Whole dollars.
    pub copay_range: Bounds<u64>,
    pub specialty_copay_range: Bounds<u64>,
    pub submitted_range: Bounds<u64>,
}

impl Default for PharmacyConfig {
    fn default() -> Self {
        Self {
            rejection_rate: 0.15,
            dosing_error_rate: 0.05,
            medications_per_condition: Bounds::new(1, 2),
            max_fill_delay_days: 7,
            adherence_gap_days: Bounds::new(-5, 10),
            maintenance_refill_cap: 11,
            acute_refill_cap: 3,
            medicaid_rate: 0.15,
            plan_count_weights: [0.70, 0.25, 0.05],
            copay_range: Bounds::new(5, 75),
            specialty_copay_range: Bounds::new(50, 500),
            submitted_range: Bounds::new(50, 800),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalConfig {
    /// Abnormal-result probability for one, two, and three or more
    /// conditions.
    pub abnormal_rates: [f64; 3],
    pub lab_draws_per_condition: Bounds<u32>,
    pub notes_per_patient: Bounds<u32>,
    pub childhood_series_coverage: f64,
}

impl Default for ClinicalConfig {
    fn default() -> Self {
        Self {
            abnormal_rates: [0.05, 0.10, 0.20],
            lab_draws_per_condition: Bounds::new(2, 4),
            notes_per_patient: Bounds::new(3, 6),
            childhood_series_coverage: 0.80,
        }
    }
}

impl ClinicalConfig {
    /// Abnormal probability for a patient carrying `burden` conditions.
    pub fn abnormal_rate(&self, burden: usize) -> f64 {
        match burden {
            0 | 1 => self.abnormal_rates[0],
            2 => self.abnormal_rates[1],
            _ => self.abnormal_rates[2],
        }
    }
}

/// Top-level simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub population_size: usize,
    /// Master seed; every random stream derives from it.
    pub seed: u64,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// "As of" date for patient ages.
    pub reference_date: NaiveDate,
    /// Registration date written to both patient tables; defaults to
    /// `window_start`.
    pub created_date: Option<NaiveDate>,
    pub gender_weights: GenderWeights,
    /// Probability a patient with no sampled condition receives one
    /// uniformly chosen eligible condition.
    pub fallback_condition_rate: f64,
    pub pharmacy: PharmacyConfig,
    pub clinical: ClinicalConfig,
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population_size: 250,
            seed: 42,
            window_start: ymd(2024, 1, 1),
            window_end: ymd(2026, 1, 27),
            reference_date: ymd(2026, 1, 27),
            created_date: None,
            gender_weights: GenderWeights::default(),
            fallback_condition_rate: 0.0,
            pharmacy: PharmacyConfig::default(),
            clinical: ClinicalConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `MedsynthError::ConfigError` on malformed TOML or any value
    /// `validate` rejects.
    pub fn from_toml_str(s: &str) -> MedsynthResult<Self> {
        let config: SimulationConfig = toml::from_str(s).map_err(|e| MedsynthError::ConfigError {
            reason: format!("failed to parse config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> MedsynthResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MedsynthError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply command-line overrides. Call `validate` afterwards.
    pub fn with_overrides(mut self, population_size: Option<usize>, seed: Option<u64>) -> Self {
        if let Some(n) = population_size {
            self.population_size = n;
        }
        if let Some(s) = seed {
            self.seed = s;
        }
        self
    }

    pub fn created_date(&self) -> NaiveDate {
        self.created_date.unwrap_or(self.window_start)
    }

    /// Window length in days; non-negative once validated.
    pub fn window_days(&self) -> i64 {
        (self.window_end - self.window_start).num_days()
    }

    /// Fail fast on any value the generators cannot honour.
    pub fn validate(&self) -> MedsynthResult<()> {
        if self.population_size == 0 {
            return Err(config_error("population_size must be positive"));
        }
        if self.window_end < self.window_start {
            return Err(config_error(format!(
                "window_end {} precedes window_start {}",
                self.window_end, self.window_start
            )));
        }

        let gw = &self.gender_weights;
        check_weights("gender_weights", &[gw.male, gw.female, gw.other])?;
        check_probability("fallback_condition_rate", self.fallback_condition_rate)?;

        let ph = &self.pharmacy;
        check_probability("pharmacy.rejection_rate", ph.rejection_rate)?;
        check_probability("pharmacy.dosing_error_rate", ph.dosing_error_rate)?;
        check_probability("pharmacy.medicaid_rate", ph.medicaid_rate)?;
        check_weights("pharmacy.plan_count_weights", &ph.plan_count_weights)?;
        if ph.medications_per_condition.min == 0 {
            return Err(config_error("pharmacy.medications_per_condition.min must be at least 1"));
        }
        check_bounds("pharmacy.medications_per_condition", &ph.medications_per_condition)?;
        check_bounds("pharmacy.adherence_gap_days", &ph.adherence_gap_days)?;
        check_bounds("pharmacy.copay_range", &ph.copay_range)?;
        check_bounds("pharmacy.specialty_copay_range", &ph.specialty_copay_range)?;
        check_bounds("pharmacy.submitted_range", &ph.submitted_range)?;

        let cl = &self.clinical;
        for (i, rate) in cl.abnormal_rates.iter().enumerate() {
            check_probability(&format!("clinical.abnormal_rates[{}]", i), *rate)?;
        }
        check_probability("clinical.childhood_series_coverage", cl.childhood_series_coverage)?;
        check_bounds("clinical.lab_draws_per_condition", &cl.lab_draws_per_condition)?;
        check_bounds("clinical.notes_per_patient", &cl.notes_per_patient)?;

        Ok(())
    }
}

fn config_error(reason: impl Into<String>) -> MedsynthError {
    MedsynthError::ConfigError { reason: reason.into() }
}

fn check_probability(name: &str, value: f64) -> MedsynthResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(config_error(format!("{} must be in [0, 1], got {}", name, value)))
    }
}

fn check_weights(name: &str, weights: &[f64]) -> MedsynthResult<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(config_error(format!("{} must be finite and non-negative", name)));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(config_error(format!("{} must sum to a positive value", name)));
    }
    Ok(())
}

fn check_bounds<T: PartialOrd + std::fmt::Debug>(name: &str, bounds: &Bounds<T>) -> MedsynthResult<()> {
    if bounds.is_ordered() {
        Ok(())
    } else {
        Err(config_error(format!(
            "{}: min {:?} exceeds max {:?}",
            name, bounds.min, bounds.max
        )))
    }
}

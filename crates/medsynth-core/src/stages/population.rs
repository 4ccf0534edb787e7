//! Stage 1: the shared patient population.
//!
//! Produces identity, demographics, contact details, and allergies. The
//! condition list is left empty for the assignment stage to fill.

use chrono::{Months, NaiveDate};
use rand::Rng;
use tracing::{debug, info};

use medsynth_catalog::{AgeBracket, AllergySpec, Catalog, GenderWeights, SimulationConfig};
use medsynth_contracts::{
    ids::PatientId,
    patient::{age_on, Gender, Patient},
};

use crate::{identity, rng::patient_rng};

use super::{add_days, weighted_index};

pub const STREAM: &str = "population";

/// Patients `PT00001..=PTnnnnn` in id order.
pub fn generate_population(config: &SimulationConfig, catalog: &Catalog) -> Vec<Patient> {
    let patients: Vec<Patient> = (1..=config.population_size as u32)
        .map(|seq| generate_patient(PatientId(seq), config, catalog))
        .collect();
    info!(patients = patients.len(), "population generated");
    patients
}

/// One patient, drawn from that patient's own population stream.
pub fn generate_patient(patient_id: PatientId, config: &SimulationConfig, catalog: &Catalog) -> Patient {
    let mut rng = patient_rng(config.seed, STREAM, patient_id);

    let target_age = sample_age(&mut rng, catalog.age_distribution());
    let gender = sample_gender(&mut rng, &config.gender_weights);
    let date_of_birth = birth_date(&mut rng, target_age, config.reference_date);

    let first_name = identity::first_name(&mut rng, gender);
    let last_name = identity::last_name(&mut rng);
    let ssn = identity::ssn(&mut rng);
    let phone = identity::phone(&mut rng);
    let email = identity::email(&mut rng, &first_name, &last_name);
    let (address, city, state, zip_code) = identity::address(&mut rng);
    let drug_allergies = sample_allergies(&mut rng, catalog.drug_allergies());
    let food_allergies = sample_allergies(&mut rng, catalog.food_allergies());

    debug!(patient_id = %patient_id, age = target_age, gender = %gender, "patient drawn");

    Patient {
        patient_id,
        first_name,
        last_name,
        date_of_birth,
        age: age_on(date_of_birth, config.reference_date),
        gender,
        ssn,
        phone,
        email,
        address,
        city,
        state,
        zip_code,
        conditions: Vec::new(),
        drug_allergies,
        food_allergies,
        created_date: config.created_date(),
    }
}

/// Pick a bracket by weight, then an age uniformly inside it.
pub fn sample_age<R: Rng>(rng: &mut R, brackets: &[AgeBracket]) -> u32 {
    let weights: Vec<f64> = brackets.iter().map(|b| b.weight).collect();
    match brackets.get(weighted_index(rng, &weights)) {
        Some(bracket) => rng.gen_range(bracket.min_age..=bracket.max_age),
        None => 0,
    }
}

pub fn sample_gender<R: Rng>(rng: &mut R, weights: &GenderWeights) -> Gender {
    match weighted_index(rng, &[weights.male, weights.female, weights.other]) {
        0 => Gender::Male,
        1 => Gender::Female,
        _ => Gender::Other,
    }
}

/// A birth date at which the patient is exactly `age` on `reference`.
///
/// The birthday is uniform over the year of dates that give that age.
pub fn birth_date<R: Rng>(rng: &mut R, age: u32, reference: NaiveDate) -> NaiveDate {
    let latest = reference
        .checked_sub_months(Months::new(12 * age))
        .unwrap_or(reference);
    let before_earliest = reference
        .checked_sub_months(Months::new(12 * (age + 1)))
        .unwrap_or(latest);
    let span = (latest - before_earliest).num_days().max(1);
    add_days(latest, -rng.gen_range(0..span))
}

/// Each allergy is present independently at its prevalence.
pub fn sample_allergies<R: Rng>(rng: &mut R, allergies: &[AllergySpec]) -> Vec<String> {
    allergies
        .iter()
        .filter(|a| rng.gen::<f64>() < a.prevalence)
        .map(|a| a.name.clone())
        .collect()
}

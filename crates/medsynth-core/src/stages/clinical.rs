//! Stage 4: diagnoses, lab results, clinical notes, and immunizations.
//!
//! Everything for a patient derives from that patient's demographics and
//! assignment plus the shared catalog. A patient without conditions gets no
//! diagnoses, labs, or notes, but still receives immunizations.

use chrono::{Datelike, Months, NaiveDate};
use rand::{seq::SliceRandom, Rng};
use tracing::debug;

use medsynth_catalog::{
    AdultVaccine, Catalog, ImmunizationCatalog, LabComponent, SimulationConfig, VaccineSchedule,
};
use medsynth_contracts::{
    clinical::{ClinicalNote, Diagnosis, DiagnosisStatus, Immunization, LabFlag, LabResult, NoteType},
    patient::{age_on, Gender, Patient},
};

use crate::{identity, rng::patient_rng};

use super::{add_days, assignment::Assignment, date_between, round2, weighted_index, Sequences};

pub const STREAM: &str = "clinical";

/// Diagnoses are dated up to this many days before the window opens.
const DIAGNOSIS_LOOKBACK_DAYS: i64 = 730;

const PERFORMING_LABS: &[&str] = &["Quest Diagnostics", "LabCorp", "Hospital Lab"];

const DEPARTMENTS: &[&str] = &[
    "Primary Care",
    "Internal Medicine",
    "Family Medicine",
    "Specialty Clinic",
];

const SPECIALTIES: &[&str] = &["Cardiology", "Endocrinology", "Pulmonology", "Neurology"];

/// Relative weights of `NoteType::ALL`.
const NOTE_TYPE_WEIGHTS: [f64; 3] = [2.0, 2.0, 1.0];

/// Line break inside note text, written as the two characters `\n`.
const BR: &str = "\\n";

/// Clinical records for one patient.
#[derive(Debug, Clone, Default)]
pub struct ClinicalRecords {
    pub diagnoses: Vec<Diagnosis>,
    pub labs: Vec<LabResult>,
    pub notes: Vec<ClinicalNote>,
    pub immunizations: Vec<Immunization>,
}

pub fn clinical_records(
    patient: &Patient,
    assignment: &Assignment,
    catalog: &Catalog,
    config: &SimulationConfig,
    sequences: &mut Sequences,
) -> ClinicalRecords {
    let mut rng = patient_rng(config.seed, STREAM, patient.patient_id);

    let records = ClinicalRecords {
        diagnoses: diagnoses(&mut rng, patient, assignment, catalog, config),
        labs: labs(&mut rng, patient, assignment, catalog, config),
        notes: notes(&mut rng, patient, assignment, config, sequences),
        immunizations: immunizations(&mut rng, patient, catalog.immunizations(), config),
    };

    debug!(
        patient_id = %patient.patient_id,
        diagnoses = records.diagnoses.len(),
        labs = records.labs.len(),
        notes = records.notes.len(),
        immunizations = records.immunizations.len(),
        "clinical records generated"
    );
    records
}

// ── Diagnoses ────────────────────────────────────────────────────────────────

fn diagnoses<R: Rng>(
    rng: &mut R,
    patient: &Patient,
    assignment: &Assignment,
    catalog: &Catalog,
    config: &SimulationConfig,
) -> Vec<Diagnosis> {
    assignment
        .conditions
        .iter()
        .filter_map(|name| catalog.condition(name))
        .map(|condition| Diagnosis {
            patient_id: patient.patient_id,
            diagnosis_code: condition.icd10.clone(),
            diagnosis_description: condition.name.clone(),
            diagnosis_date: add_days(config.window_start, -rng.gen_range(0..=DIAGNOSIS_LOOKBACK_DAYS)),
            status: if rng.gen_range(0..4) == 0 {
                DiagnosisStatus::Resolved
            } else {
                DiagnosisStatus::Active
            },
            is_chronic: condition.chronic,
            diagnosing_provider_npi: identity::npi(rng),
        })
        .collect()
}

// ── Labs ─────────────────────────────────────────────────────────────────────

/// A value strictly outside `[low, high]`, rounded to two decimals.
///
/// Below-range values are `low × [0.5, 0.95]` and above-range values
/// `high × [1.05, 1.5]`. Ranges starting at or below zero only go above.
/// A value that rounds back into the range moves one hundredth outward.
pub fn abnormal_value<R: Rng>(rng: &mut R, low: f64, high: f64) -> f64 {
    let below = low > 0.0 && rng.gen::<f64>() < 0.5;
    if below {
        let value = round2(rng.gen_range(low * 0.5..=low * 0.95));
        if value >= low {
            round2(low - 0.01)
        } else {
            value
        }
    } else {
        let value = if high > 0.0 {
            round2(rng.gen_range(high * 1.05..=high * 1.5))
        } else {
            high
        };
        if value <= high {
            round2(high + 0.01)
        } else {
            value
        }
    }
}

/// A value inside `[low, high]`, rounded to two decimals.
pub fn normal_value<R: Rng>(rng: &mut R, low: f64, high: f64) -> f64 {
    round2(rng.gen_range(low..=high)).clamp(low, high)
}

fn lab_result<R: Rng>(
    rng: &mut R,
    patient: &Patient,
    component: &LabComponent,
    collection_date: NaiveDate,
    ordering_provider_npi: &str,
    abnormal: bool,
) -> LabResult {
    let (result_value, flag) = if abnormal {
        (abnormal_value(rng, component.low, component.high), LabFlag::Abnormal)
    } else {
        (normal_value(rng, component.low, component.high), LabFlag::Normal)
    };
    LabResult {
        patient_id: patient.patient_id,
        order_date: collection_date,
        collection_date,
        result_date: add_days(collection_date, rng.gen_range(1..=3)),
        test_name: component.panel.clone(),
        test_component: component.component.clone(),
        result_value,
        unit: component.unit.clone(),
        reference_low: component.low,
        reference_high: component.high,
        flag,
        ordering_provider_npi: ordering_provider_npi.to_string(),
        performing_lab: PERFORMING_LABS.choose(rng).copied().unwrap_or_default().to_string(),
    }
}

/// Panels for every assigned condition that has one, drawn several times
/// across the window. Abnormality scales with the patient's condition
/// count.
fn labs<R: Rng>(
    rng: &mut R,
    patient: &Patient,
    assignment: &Assignment,
    catalog: &Catalog,
    config: &SimulationConfig,
) -> Vec<LabResult> {
    let abnormal_rate = config.clinical.abnormal_rate(assignment.conditions.len());
    let draws = config.clinical.lab_draws_per_condition;
    let mut results = Vec::new();

    for condition in assignment.conditions.iter().filter_map(|name| catalog.condition(name)) {
        if condition.labs.is_empty() {
            continue;
        }
        for _ in 0..rng.gen_range(draws.min..=draws.max) {
            let collection_date = date_between(rng, config.window_start, config.window_end);
            let npi = identity::npi(rng);
            for component in &condition.labs {
                let abnormal = rng.gen::<f64>() < abnormal_rate;
                results.push(lab_result(rng, patient, component, collection_date, &npi, abnormal));
            }
        }
    }
    results
}

// ── Notes ────────────────────────────────────────────────────────────────────

fn gender_word(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "male",
        Gender::Female => "female",
        Gender::Other => "patient",
    }
}

fn soap_note<R: Rng>(rng: &mut R, patient: &Patient, conditions: &[String], medications: &[&str]) -> String {
    let condition_text = conditions.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
    let subjective = match rng.gen_range(0..3) {
        0 => format!("Patient presents for follow-up of {condition_text}. Reports feeling generally well."),
        1 => format!("Patient seen for management of {condition_text}. No new complaints today."),
        _ => format!(
            "{}-year-old {} with history of {condition_text} presents for routine follow-up.",
            patient.age,
            gender_word(patient.gender)
        ),
    };

    let vitals = format!(
        "BP {}/{}, HR {}, RR {}, Temp {:.1}°F, O2 Sat {}% on room air",
        rng.gen_range(110..=140),
        rng.gen_range(70..=90),
        rng.gen_range(60..=90),
        rng.gen_range(12..=20),
        rng.gen_range(97.8..=99.2),
        rng.gen_range(95..=100),
    );
    let objective = format!(
        "Vital Signs: {vitals}. General: Alert and oriented. Well-appearing. \
         Physical exam unremarkable for stated conditions."
    );

    let assessment = conditions
        .iter()
        .take(2)
        .map(|c| format!("{c} - stable"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut plan = vec![
        format!("Continue current medications as prescribed ({})", medications.join(", ")),
        "Follow up in 3 months or sooner if concerns".to_string(),
        "Reinforced medication adherence and lifestyle modifications".to_string(),
    ];
    if conditions.iter().any(|c| c == "Type 2 Diabetes") {
        plan.push("Recheck HbA1c in 3 months".to_string());
    }
    if conditions.iter().any(|c| c == "Hypertension") {
        plan.push("Monitor blood pressure at home".to_string());
    }

    format!(
        "SUBJECTIVE:{BR}{subjective}{BR}{BR}OBJECTIVE:{BR}{objective}{BR}{BR}\
         ASSESSMENT:{BR}Assessment: {assessment}{BR}{BR}Plan: {}",
        plan.join("; ")
    )
}

fn progress_note<R: Rng>(rng: &mut R, patient: &Patient, conditions: &[String], medications: &[&str]) -> String {
    let condition_text = conditions.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
    let medication_text = medications.join(", ");
    if rng.gen::<f64>() < 0.5 {
        format!(
            "Progress Note:{BR}Patient: {}, {}yo {}{BR}Chief Complaint: Follow-up {condition_text}{BR}\
             Patient continues management of {condition_text}. \
             Current medications ({medication_text}) reviewed and refilled as appropriate. \
             Patient counseled on importance of medication adherence and lifestyle modifications. \
             No acute concerns at this time. Will continue current plan of care.",
            patient.full_name(),
            patient.age,
            patient.gender,
        )
    } else {
        format!(
            "Visit Note:{BR}{} seen today for {condition_text} management. \
             Patient reports good adherence to {medication_text}. \
             Reviewed recent lab results with patient. \
             Plan to continue current regimen and follow up as scheduled.",
            patient.full_name(),
        )
    }
}

fn consultation_note(patient: &Patient, specialty: &str, conditions: &[String], medications: &[&str]) -> String {
    let condition_text = conditions.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
    format!(
        "Consultation Note - {specialty}{BR}Patient: {}, {}yo {}{BR}\
         Reason for Consultation: {condition_text}{BR}{BR}\
         Thank you for this consultation. I have reviewed the patient's history and examination. \
         Patient has been managing {condition_text} with {}. \
         I recommend continuation of current therapy with close monitoring. \
         Will coordinate care with primary care provider.",
        patient.full_name(),
        patient.age,
        patient.gender,
        medications.join(", "),
    )
}

/// Notes dated across the window, numbered in date order.
fn notes<R: Rng>(
    rng: &mut R,
    patient: &Patient,
    assignment: &Assignment,
    config: &SimulationConfig,
    sequences: &mut Sequences,
) -> Vec<ClinicalNote> {
    if assignment.is_empty() {
        return Vec::new();
    }
    let medications = assignment.medication_names();
    let count = config.clinical.notes_per_patient;

    let mut drafts = Vec::new();
    for _ in 0..rng.gen_range(count.min..=count.max) {
        let note_date = date_between(rng, config.window_start, config.window_end);
        let note_type = NoteType::ALL[weighted_index(rng, &NOTE_TYPE_WEIGHTS)];
        let (note_text, department) = match note_type {
            NoteType::Soap => (
                soap_note(rng, patient, &assignment.conditions, &medications),
                DEPARTMENTS.choose(rng).copied().unwrap_or_default(),
            ),
            NoteType::Progress => (
                progress_note(rng, patient, &assignment.conditions, &medications),
                DEPARTMENTS.choose(rng).copied().unwrap_or_default(),
            ),
            NoteType::Consultation => {
                let specialty = SPECIALTIES.choose(rng).copied().unwrap_or_default();
                (
                    consultation_note(patient, specialty, &assignment.conditions, &medications),
                    specialty,
                )
            }
        };
        drafts.push((note_date, note_type, note_text, department, identity::npi(rng), identity::provider_name(rng)));
    }
    drafts.sort_by_key(|draft| draft.0);

    drafts
        .into_iter()
        .map(|(note_date, note_type, note_text, department, author_npi, author_name)| ClinicalNote {
            note_id: sequences.next_note(),
            patient_id: patient.patient_id,
            note_date,
            note_type,
            note_text,
            author_npi,
            author_name,
            department: department.to_string(),
        })
        .collect()
}

// ── Immunizations ────────────────────────────────────────────────────────────

/// The first date on which `patient` has reached `age`.
fn date_reaching_age(patient: &Patient, age: u32) -> NaiveDate {
    let date = patient
        .date_of_birth
        .checked_add_months(Months::new(12 * age))
        .unwrap_or(patient.date_of_birth);
    // Feb 29 birthdays land on Feb 28 in common years.
    if age_on(patient.date_of_birth, date) < age {
        add_days(date, 1)
    } else {
        date
    }
}

fn lot_number<R: Rng>(rng: &mut R, prefix: &str) -> String {
    format!("{prefix}{}", rng.gen_range(100_000..=999_999))
}

fn childhood_series<R: Rng>(
    rng: &mut R,
    patient: &Patient,
    catalog: &ImmunizationCatalog,
    config: &SimulationConfig,
) -> Vec<Immunization> {
    let mut records = Vec::new();
    for vaccine in &catalog.childhood {
        let administered = add_days(patient.date_of_birth, rng.gen_range(90..=730));
        records.push(Immunization {
            patient_id: patient.patient_id,
            vaccine_name: vaccine.vaccine_name.clone(),
            cvx_code: vaccine.cvx_code.clone(),
            administration_date: administered.min(config.reference_date).max(patient.date_of_birth),
            dose_number: 1,
            route: catalog.childhood_routes.choose(rng).cloned().unwrap_or_default(),
            site: catalog.childhood_sites.choose(rng).cloned().unwrap_or_default(),
            lot_number: lot_number(rng, "LOT"),
            manufacturer: catalog.childhood_manufacturers.choose(rng).cloned().unwrap_or_default(),
            administered_by_npi: identity::npi(rng),
        });
    }
    records
}

/// Administration dates of one adult vaccine inside the window, restricted
/// to dates on which the patient meets the minimum age.
fn adult_dates<R: Rng>(
    rng: &mut R,
    patient: &Patient,
    vaccine: &AdultVaccine,
    config: &SimulationConfig,
) -> Vec<NaiveDate> {
    let earliest = config.window_start.max(date_reaching_age(patient, vaccine.min_age));
    if earliest > config.window_end {
        return Vec::new();
    }
    match vaccine.schedule {
        VaccineSchedule::Once => vec![date_between(rng, earliest, config.window_end)],
        VaccineSchedule::Seasonal => (config.window_start.year()..=config.window_end.year())
            .filter_map(|year| NaiveDate::from_ymd_opt(year, rng.gen_range(9..=11), rng.gen_range(1..=28)))
            .filter(|date| *date >= earliest && *date <= config.window_end)
            .collect(),
    }
}

fn adult_vaccines<R: Rng>(
    rng: &mut R,
    patient: &Patient,
    catalog: &ImmunizationCatalog,
    config: &SimulationConfig,
) -> Vec<Immunization> {
    let mut records = Vec::new();
    for vaccine in &catalog.adult {
        if patient.age < vaccine.min_age || rng.gen::<f64>() >= vaccine.coverage {
            continue;
        }
        for administration_date in adult_dates(rng, patient, vaccine, config) {
            records.push(Immunization {
                patient_id: patient.patient_id,
                vaccine_name: vaccine.vaccine_name.clone(),
                cvx_code: vaccine.cvx_code.clone(),
                administration_date,
                dose_number: rng.gen_range(1..=vaccine.max_dose),
                route: vaccine.route.clone(),
                site: vaccine.site.clone(),
                lot_number: lot_number(rng, &vaccine.lot_prefix),
                manufacturer: vaccine.manufacturers.choose(rng).cloned().unwrap_or_default(),
                administered_by_npi: identity::npi(rng),
            });
        }
    }
    records
}

fn immunizations<R: Rng>(
    rng: &mut R,
    patient: &Patient,
    catalog: &ImmunizationCatalog,
    config: &SimulationConfig,
) -> Vec<Immunization> {
    let mut records = Vec::new();
    if rng.gen::<f64>() < config.clinical.childhood_series_coverage {
        records.extend(childhood_series(rng, patient, catalog, config));
    }
    records.extend(adult_vaccines(rng, patient, catalog, config));
    records
}

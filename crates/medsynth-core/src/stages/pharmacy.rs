//! Stage 3: insurance profiles, prescription lineages, and adjudication.
//!
//! A lineage starts with a written date uniform in the window and an
//! original fill (`refill_number == 0`) a short delay later, capped at the
//! window end. Each refill lands `days_supply` plus an adherence
//! gap after the previous fill; the lineage stops at the window end or its
//! refill cap, whichever comes first. Every fill is submitted to the
//! patient's primary plan.

use chrono::{NaiveDate, NaiveTime};
use rand::{seq::SliceRandom, Rng};
use tracing::debug;

use medsynth_catalog::{
    Bounds, Carrier, CarrierProgram, Catalog, DosageForm, Medication, SimulationConfig,
};
use medsynth_contracts::{
    ids::{Cents, RxNumber},
    patient::Patient,
    pharmacy::{Adjudication, InsuranceProfile, InsuranceRank, InsuranceTransaction, Prescription},
};

use crate::{identity, rng::patient_rng};

use super::{add_days, assignment::Assignment, date_between, weighted_index, Sequences};

pub const INSURANCE_STREAM: &str = "insurance";
pub const STREAM: &str = "pharmacy";

/// Age from which the primary plan is always Medicare.
pub const MEDICARE_AGE: u32 = 65;

/// Bounds for deliberately implausible dosing.
const ABERRANT_QUANTITY: (u32, u32) = (1, 500);
const ABERRANT_DAYS_SUPPLY: (u32, u32) = (1, 180);

const TABLET_SIGS: &[&str] = &[
    "Take 1 tablet by mouth daily",
    "Take 1 tablet by mouth twice daily",
    "Take 1 capsule by mouth once daily",
    "Take 2 tablets by mouth twice daily",
    "Take 1 tablet by mouth at bedtime",
    "Take 1-2 tablets by mouth every 4-6 hours as needed",
];

const INHALER_SIGS: &[&str] = &[
    "Inhale 2 puffs twice daily",
    "Inhale 1 puff by mouth once daily",
    "Inhale 2 puffs every 4-6 hours as needed",
];

const INSULIN_SIGS: &[&str] = &[
    "Inject 10 units subcutaneously at bedtime",
    "Inject subcutaneously as directed per sliding scale",
];

const INJECTABLE_SIGS: &[&str] = &[
    "Inject subcutaneously as directed",
    "Inject 1 pen subcutaneously once weekly",
    "Inject 1 pen subcutaneously every 2 weeks",
];

/// Prescriptions and their claims for one patient.
#[derive(Debug, Clone, Default)]
pub struct PharmacyRecords {
    pub prescriptions: Vec<Prescription>,
    pub transactions: Vec<InsuranceTransaction>,
}

// ── Insurance ────────────────────────────────────────────────────────────────

/// One to three plans, primary first, each with a distinct carrier.
///
/// The primary carrier is Medicare from age 65, Medicaid for a share of
/// younger patients, and otherwise a commercial carrier.
pub fn insurance_profiles(
    patient: &Patient,
    catalog: &Catalog,
    config: &SimulationConfig,
) -> Vec<InsuranceProfile> {
    let mut rng = patient_rng(config.seed, INSURANCE_STREAM, patient.patient_id);
    let carriers = catalog.carriers();

    let plan_count = (weighted_index(&mut rng, &config.pharmacy.plan_count_weights) + 1).min(carriers.len());
    let medicaid_draw = rng.gen::<f64>();

    let commercial: Vec<&Carrier> = carriers.iter().filter(|c| c.program.is_none()).collect();
    let primary = if patient.age >= MEDICARE_AGE {
        catalog.carrier_for_program(CarrierProgram::Medicare)
    } else if medicaid_draw < config.pharmacy.medicaid_rate {
        catalog.carrier_for_program(CarrierProgram::Medicaid)
    } else {
        commercial.choose(&mut rng).copied()
    };

    let mut held: Vec<&Carrier> = Vec::with_capacity(plan_count);
    held.extend(primary.or_else(|| carriers.first()));
    while held.len() < plan_count {
        let remaining: Vec<&Carrier> = carriers
            .iter()
            .filter(|c| !held.iter().any(|h| h.name == c.name))
            .collect();
        match remaining.choose(&mut rng) {
            Some(&carrier) => held.push(carrier),
            None => break,
        }
    }

    held.into_iter()
        .zip(InsuranceRank::ALL)
        .map(|(carrier, rank)| InsuranceProfile {
            patient_id: patient.patient_id,
            rank,
            carrier_name: carrier.name.clone(),
            rx_bin: carrier.bin.clone(),
            rx_pcn: carrier.pcn.clone(),
            rx_group: format!("{}{}", carrier.group_prefix, rng.gen_range(10_000..=99_999)),
            cardholder_id: rng.gen_range(100_000_000u32..=999_999_999).to_string(),
            person_code: rng.gen_range(1..=4),
            effective_date: config.created_date(),
            termination_date: None,
        })
        .collect()
}

// ── Prescriptions ────────────────────────────────────────────────────────────

/// Quantity, days supply, and sig for one lineage.
fn dosing<R: Rng>(rng: &mut R, form: DosageForm, aberrant: bool) -> (u32, u32, String) {
    let (quantity, days_supply, sigs) = match form {
        DosageForm::Inhaler => (1, 30, INHALER_SIGS),
        DosageForm::Insulin => (*[1, 3, 5].choose(rng).unwrap_or(&1), 30, INSULIN_SIGS),
        DosageForm::Injectable => (*[1, 2, 4].choose(rng).unwrap_or(&1), 28, INJECTABLE_SIGS),
        DosageForm::Tablet => {
            let q = *[30, 60, 90].choose(rng).unwrap_or(&30);
            (q, q, TABLET_SIGS)
        }
    };
    let sig = sigs.choose(rng).copied().unwrap_or_default().to_string();

    if aberrant {
        let quantity = rng.gen_range(ABERRANT_QUANTITY.0..=ABERRANT_QUANTITY.1);
        let days_supply = rng.gen_range(ABERRANT_DAYS_SUPPLY.0..=ABERRANT_DAYS_SUPPLY.1);
        return (quantity, days_supply, sig);
    }
    (quantity, days_supply, sig)
}

fn dollars_between<R: Rng>(rng: &mut R, range: Bounds<u64>) -> Cents {
    Cents(rng.gen_range(range.min * 100..=range.max * 100))
}

fn adjudicate<R: Rng>(
    rng: &mut R,
    rx: &Prescription,
    primary: &InsuranceProfile,
    catalog: &Catalog,
    config: &SimulationConfig,
    sequences: &mut Sequences,
) -> InsuranceTransaction {
    let submitted_amount = dollars_between(rng, config.pharmacy.submitted_range);
    let rejected = rng.gen::<f64>() < config.pharmacy.rejection_rate;

    let (adjudication, paid_amount, patient_pay) = match catalog.reject_codes().choose(rng) {
        Some(reject) if rejected => (
            Adjudication::Rejected {
                code: reject.code.clone(),
                message: reject.message.clone(),
            },
            Cents::ZERO,
            Cents::ZERO,
        ),
        _ => {
            let patient_pay = rx.copay.min(submitted_amount);
            (
                Adjudication::Approved,
                submitted_amount.saturating_sub(patient_pay),
                patient_pay,
            )
        }
    };

    let hour = rng.gen_range(8..=20);
    let minute = rng.gen_range(0..=59);
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();

    InsuranceTransaction {
        transaction_id: sequences.next_transaction(),
        rx_number: rx.rx_number,
        patient_id: rx.patient_id,
        fill_date: rx.fill_date,
        rx_bin: primary.rx_bin.clone(),
        rx_pcn: primary.rx_pcn.clone(),
        rx_group: primary.rx_group.clone(),
        cardholder_id: primary.cardholder_id.clone(),
        ndc: rx.ndc.clone(),
        quantity: rx.quantity,
        days_supply: rx.days_supply,
        submitted_amount,
        paid_amount,
        patient_pay,
        adjudication,
        submission_clarification_code: None,
        transaction_timestamp: rx.fill_date.and_time(time),
    }
}

/// Refill cap for one lineage.
fn refill_cap<R: Rng>(rng: &mut R, maintenance: bool, config: &SimulationConfig) -> u32 {
    if maintenance {
        config.pharmacy.maintenance_refill_cap
    } else {
        rng.gen_range(0..=config.pharmacy.acute_refill_cap)
    }
}

/// Fill dates of one lineage: the first fill, then one per refill until the
/// window closes or `cap` refills have been issued.
fn fill_schedule<R: Rng>(
    rng: &mut R,
    first_fill: NaiveDate,
    days_supply: u32,
    cap: u32,
    config: &SimulationConfig,
) -> Vec<NaiveDate> {
    let gap = config.pharmacy.adherence_gap_days;
    let mut fills = Vec::new();
    let mut fill_date = first_fill;
    for _ in 0..=cap {
        if fill_date > config.window_end {
            break;
        }
        fills.push(fill_date);
        let step = (days_supply as i64 + rng.gen_range(gap.min..=gap.max)).max(1);
        fill_date = add_days(fill_date, step);
    }
    fills
}

/// Every fill for every regimen entry of `patient`, with one claim per fill.
///
/// Returns no records for a patient without conditions.
pub fn pharmacy_records(
    patient: &Patient,
    assignment: &Assignment,
    primary: &InsuranceProfile,
    catalog: &Catalog,
    config: &SimulationConfig,
    sequences: &mut Sequences,
) -> PharmacyRecords {
    let mut rng = patient_rng(config.seed, STREAM, patient.patient_id);
    let mut records = PharmacyRecords::default();

    for entry in &assignment.regimen {
        let Some(medication) = catalog.medication(&entry.medication) else {
            continue;
        };
        let maintenance = catalog
            .condition(&entry.condition)
            .is_some_and(|c| c.maintenance);

        let rx_number = sequences.next_rx();
        let lineage = new_lineage(&mut rng, rx_number, patient, &entry.condition, medication, maintenance, config);

        for (refill_number, fill_date) in lineage.fills.iter().enumerate() {
            let rx = Prescription {
                fill_date: *fill_date,
                refill_number: refill_number as u32,
                ..lineage.template.clone()
            };
            let txn = adjudicate(&mut rng, &rx, primary, catalog, config, sequences);
            records.transactions.push(txn);
            records.prescriptions.push(rx);
        }
    }

    debug!(
        patient_id = %patient.patient_id,
        prescriptions = records.prescriptions.len(),
        "pharmacy records generated"
    );
    records
}

struct Lineage {
    /// Shared fields of every fill; `fill_date` and `refill_number` are
    /// overwritten per fill.
    template: Prescription,
    fills: Vec<NaiveDate>,
}

fn new_lineage<R: Rng>(
    rng: &mut R,
    rx_number: RxNumber,
    patient: &Patient,
    condition: &str,
    medication: &Medication,
    maintenance: bool,
    config: &SimulationConfig,
) -> Lineage {
    let dosing_error = rng.gen::<f64>() < config.pharmacy.dosing_error_rate;
    let (quantity, days_supply, sig) = dosing(rng, medication.form, dosing_error);

    let written_date = date_between(rng, config.window_start, config.window_end);
    let delay = rng.gen_range(0..=config.pharmacy.max_fill_delay_days) as i64;
    let first_fill = add_days(written_date, delay).min(config.window_end);

    let copay_tier = if medication.is_specialty() {
        config.pharmacy.specialty_copay_range
    } else {
        config.pharmacy.copay_range
    };
    let copay = dollars_between(rng, copay_tier);
    let cap = refill_cap(rng, maintenance, config);
    let fills = fill_schedule(rng, first_fill, days_supply, cap, config);

    Lineage {
        template: Prescription {
            rx_number,
            patient_id: patient.patient_id,
            medication_name: medication.name.clone(),
            ndc: medication.ndc.clone(),
            quantity,
            days_supply,
            written_date,
            fill_date: first_fill,
            refill_number: 0,
            sig,
            prescriber_npi: identity::npi(rng),
            copay,
            condition: condition.to_string(),
            is_rems: medication.rems,
            dosing_error,
        },
        fills,
    }
}

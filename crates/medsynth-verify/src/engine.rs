//! Rule-based dataset verifier for medsynth.
//!
//! `DatasetVerifier` implements the `Verifier` trait from `medsynth-core`.
//! Every built-in rule runs in a fixed order, then every custom rule in
//! name order. All failures are collected before returning so one report
//! shows the full failure set.
//!
//! Custom rules are plain functions registered via `register_rule`; a
//! downstream loader can add checks of its own without touching the
//! built-in set.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, warn};

use medsynth_catalog::Catalog;
use medsynth_contracts::{
    clinical::LabFlag,
    error::MedsynthResult,
    ids::{PatientId, RxNumber},
    patient::{age_on, Patient},
    pharmacy::Prescription,
    table::{names, Dataset},
    verify::{VerificationFailure, VerificationReport},
};
use medsynth_core::traits::Verifier;

/// A caller-supplied rule.
///
/// Receives the whole dataset. Returns one message per violation; an empty
/// list means the rule passed.
pub type CustomRuleFn = Box<dyn Fn(&Dataset) -> Vec<String> + Send + Sync>;

/// Stable identifiers of the built-in rules, in evaluation order.
pub mod rules {
    pub const UNIQUE_PATIENT_IDS: &str = "unique-patient-ids";
    pub const SHARED_PATIENT_IDS: &str = "shared-patient-ids";
    pub const AGE_MATCHES_DOB: &str = "age-matches-dob";
    pub const FILL_AFTER_WRITTEN: &str = "fill-after-written";
    pub const REFILL_SEQUENCE: &str = "refill-sequence";
    pub const PRESCRIPTION_CONDITION_ASSIGNED: &str = "prescription-condition-assigned";
    pub const REMS_FLAG_MATCHES_CATALOG: &str = "rems-flag-matches-catalog";
    pub const REJECTED_CLAIMS_UNPAID: &str = "rejected-claims-unpaid";
    pub const APPROVED_CLAIMS_BALANCE: &str = "approved-claims-balance";
    pub const LAB_FLAG_MATCHES_RANGE: &str = "lab-flag-matches-range";
    pub const DIAGNOSES_MIRROR_CONDITIONS: &str = "diagnoses-mirror-conditions";
    pub const FOREIGN_KEYS: &str = "foreign-keys";
    pub const IMMUNIZATION_AGE_ELIGIBILITY: &str = "immunization-age-eligibility";
}

/// Failures reported per rule before the rest are summarized.
const MAX_FAILURES_PER_RULE: usize = 20;

type BuiltinRule = fn(&DatasetVerifier, &Dataset) -> Vec<String>;

const BUILTIN_RULES: &[(&str, BuiltinRule)] = &[
    (rules::UNIQUE_PATIENT_IDS, DatasetVerifier::unique_patient_ids),
    (rules::SHARED_PATIENT_IDS, DatasetVerifier::shared_patient_ids),
    (rules::AGE_MATCHES_DOB, DatasetVerifier::age_matches_dob),
    (rules::FILL_AFTER_WRITTEN, DatasetVerifier::fill_after_written),
    (rules::REFILL_SEQUENCE, DatasetVerifier::refill_sequence),
    (rules::PRESCRIPTION_CONDITION_ASSIGNED, DatasetVerifier::prescription_condition_assigned),
    (rules::REMS_FLAG_MATCHES_CATALOG, DatasetVerifier::rems_flag_matches_catalog),
    (rules::REJECTED_CLAIMS_UNPAID, DatasetVerifier::rejected_claims_unpaid),
    (rules::APPROVED_CLAIMS_BALANCE, DatasetVerifier::approved_claims_balance),
    (rules::LAB_FLAG_MATCHES_RANGE, DatasetVerifier::lab_flag_matches_range),
    (rules::DIAGNOSES_MIRROR_CONDITIONS, DatasetVerifier::diagnoses_mirror_conditions),
    (rules::FOREIGN_KEYS, DatasetVerifier::foreign_keys),
    (rules::IMMUNIZATION_AGE_ELIGIBILITY, DatasetVerifier::immunization_age_eligibility),
];

/// The medsynth dataset verifier.
///
/// Holds the catalog the dataset was generated from and the reference date
/// ages were computed at; both are needed to re-derive expected values.
pub struct DatasetVerifier {
    catalog: Catalog,
    reference_date: NaiveDate,
    custom_rules: BTreeMap<String, CustomRuleFn>,
}

impl DatasetVerifier {
    /// Create a verifier with only the built-in rules.
    pub fn new(catalog: Catalog, reference_date: NaiveDate) -> Self {
        Self {
            catalog,
            reference_date,
            custom_rules: BTreeMap::new(),
        }
    }

    /// Register a custom rule under `name`.
    ///
    /// Registering the same name twice replaces the previous function.
    pub fn register_rule(&mut self, name: impl Into<String>, f: CustomRuleFn) {
        self.custom_rules.insert(name.into(), f);
    }

    /// Identifiers of every rule this verifier runs, in evaluation order.
    pub fn rule_ids(&self) -> Vec<String> {
        BUILTIN_RULES
            .iter()
            .map(|(id, _)| id.to_string())
            .chain(self.custom_rules.keys().cloned())
            .collect()
    }

    // ── Identity ──────────────────────────────────────────────────────────────

    fn unique_patient_ids(&self, dataset: &Dataset) -> Vec<String> {
        let mut seen = HashSet::new();
        dataset
            .patients
            .iter()
            .filter(|p| !seen.insert(p.patient_id))
            .map(|p| format!("patient id {} appears more than once", p.patient_id))
            .collect()
    }

    /// Both patient tables must carry the same id set.
    fn shared_patient_ids(&self, dataset: &Dataset) -> Vec<String> {
        let tables = dataset.tables();
        let ids_of = |name: &str| -> BTreeSet<String> {
            tables
                .iter()
                .find(|t| t.name == name)
                .map(|t| t.column("patient_id").into_iter().map(str::to_string).collect())
                .unwrap_or_default()
        };
        let pharmacy = ids_of(names::PHARMACY_PATIENTS);
        let ehr = ids_of(names::EHR_PATIENTS);

        let mut messages: Vec<String> = pharmacy
            .difference(&ehr)
            .map(|id| format!("{id} is in {} but not {}", names::PHARMACY_PATIENTS, names::EHR_PATIENTS))
            .collect();
        messages.extend(
            ehr.difference(&pharmacy)
                .map(|id| format!("{id} is in {} but not {}", names::EHR_PATIENTS, names::PHARMACY_PATIENTS)),
        );
        messages
    }

    fn age_matches_dob(&self, dataset: &Dataset) -> Vec<String> {
        dataset
            .patients
            .iter()
            .filter_map(|p| {
                let expected = age_on(p.date_of_birth, self.reference_date);
                (p.age != expected).then(|| {
                    format!(
                        "{} has age {} but date of birth {} gives {}",
                        p.patient_id, p.age, p.date_of_birth, expected
                    )
                })
            })
            .collect()
    }

    // ── Prescriptions ─────────────────────────────────────────────────────────

    fn fill_after_written(&self, dataset: &Dataset) -> Vec<String> {
        dataset
            .prescriptions
            .iter()
            .filter(|rx| rx.fill_date < rx.written_date)
            .map(|rx| {
                format!(
                    "{} refill {} filled {} before written {}",
                    rx.rx_number, rx.refill_number, rx.fill_date, rx.written_date
                )
            })
            .collect()
    }

    /// Fills of one lineage appear in order, numbered 0, 1, 2, … with
    /// strictly increasing fill dates.
    fn refill_sequence(&self, dataset: &Dataset) -> Vec<String> {
        let mut lineages: BTreeMap<RxNumber, Vec<&Prescription>> = BTreeMap::new();
        for rx in &dataset.prescriptions {
            lineages.entry(rx.rx_number).or_default().push(rx);
        }

        let mut messages = Vec::new();
        for (rx_number, fills) in lineages {
            for (expected, rx) in fills.iter().enumerate() {
                if rx.refill_number != expected as u32 {
                    messages.push(format!(
                        "{rx_number} has refill {} where {expected} was expected",
                        rx.refill_number
                    ));
                }
            }
            for pair in fills.windows(2) {
                if pair[1].fill_date <= pair[0].fill_date {
                    messages.push(format!(
                        "{rx_number} refill {} filled {} not after {}",
                        pair[1].refill_number, pair[1].fill_date, pair[0].fill_date
                    ));
                }
            }
        }
        messages
    }

    fn prescription_condition_assigned(&self, dataset: &Dataset) -> Vec<String> {
        let patients = patient_index(&dataset.patients);
        dataset
            .prescriptions
            .iter()
            .filter(|rx| {
                patients
                    .get(&rx.patient_id)
                    .is_some_and(|p| !p.has_condition(&rx.condition))
            })
            .map(|rx| {
                format!(
                    "{} for {} treats '{}', which is not assigned",
                    rx.rx_number, rx.patient_id, rx.condition
                )
            })
            .collect()
    }

    fn rems_flag_matches_catalog(&self, dataset: &Dataset) -> Vec<String> {
        dataset
            .prescriptions
            .iter()
            .filter(|rx| rx.is_rems != self.catalog.is_rems(&rx.medication_name))
            .map(|rx| {
                format!(
                    "{} {} has is_rems={} but the catalog says {}",
                    rx.rx_number,
                    rx.medication_name,
                    rx.is_rems,
                    self.catalog.is_rems(&rx.medication_name)
                )
            })
            .collect()
    }

    // ── Claims ────────────────────────────────────────────────────────────────

    fn rejected_claims_unpaid(&self, dataset: &Dataset) -> Vec<String> {
        dataset
            .transactions
            .iter()
            .filter(|t| t.adjudication.is_rejected() && (t.paid_amount.0 != 0 || t.patient_pay.0 != 0))
            .map(|t| {
                format!(
                    "{} is rejected but pays {} (patient {})",
                    t.transaction_id, t.paid_amount, t.patient_pay
                )
            })
            .collect()
    }

    fn approved_claims_balance(&self, dataset: &Dataset) -> Vec<String> {
        dataset
            .transactions
            .iter()
            .filter(|t| {
                !t.adjudication.is_rejected() && t.paid_amount.0 + t.patient_pay.0 != t.submitted_amount.0
            })
            .map(|t| {
                format!(
                    "{}: paid {} + patient {} != submitted {}",
                    t.transaction_id, t.paid_amount, t.patient_pay, t.submitted_amount
                )
            })
            .collect()
    }

    // ── Clinical ──────────────────────────────────────────────────────────────

    fn lab_flag_matches_range(&self, dataset: &Dataset) -> Vec<String> {
        dataset
            .labs
            .iter()
            .filter(|lab| match lab.flag {
                LabFlag::Abnormal => lab.within_reference_range(),
                LabFlag::Normal => !lab.within_reference_range(),
            })
            .map(|lab| {
                format!(
                    "{} {} {} = {} flagged {} against range {}",
                    lab.patient_id,
                    lab.test_component,
                    lab.collection_date,
                    lab.result_value,
                    lab.flag,
                    lab.reference_range()
                )
            })
            .collect()
    }

    /// Each patient has exactly one diagnosis per assigned condition, coded
    /// with the catalog's ICD-10 code.
    fn diagnoses_mirror_conditions(&self, dataset: &Dataset) -> Vec<String> {
        let mut coded: HashMap<PatientId, Vec<&str>> = HashMap::new();
        let mut messages = Vec::new();

        for dx in &dataset.diagnoses {
            coded.entry(dx.patient_id).or_default().push(&dx.diagnosis_description);
            match self.catalog.condition(&dx.diagnosis_description) {
                Some(spec) if spec.icd10 != dx.diagnosis_code => messages.push(format!(
                    "{} codes '{}' as {} but the catalog says {}",
                    dx.patient_id, dx.diagnosis_description, dx.diagnosis_code, spec.icd10
                )),
                None => messages.push(format!(
                    "{} has a diagnosis for unknown condition '{}'",
                    dx.patient_id, dx.diagnosis_description
                )),
                _ => {}
            }
        }

        for patient in &dataset.patients {
            let mut have: Vec<&str> = coded.remove(&patient.patient_id).unwrap_or_default();
            let mut want: Vec<&str> = patient.conditions.iter().map(String::as_str).collect();
            have.sort_unstable();
            want.sort_unstable();
            if have != want {
                messages.push(format!(
                    "{} has diagnoses [{}] but conditions [{}]",
                    patient.patient_id,
                    have.join(", "),
                    want.join(", ")
                ));
            }
        }
        messages
    }

    /// Every child row references an existing patient, and every claim an
    /// existing prescription lineage of the same patient.
    fn foreign_keys(&self, dataset: &Dataset) -> Vec<String> {
        let patients: HashSet<PatientId> = dataset.patients.iter().map(|p| p.patient_id).collect();
        let lineages: HashMap<RxNumber, PatientId> = dataset
            .prescriptions
            .iter()
            .map(|rx| (rx.rx_number, rx.patient_id))
            .collect();

        let mut messages = Vec::new();
        let mut check = |table: &str, ids: &mut dyn Iterator<Item = PatientId>| {
            for id in ids.filter(|id| !patients.contains(id)) {
                messages.push(format!("{table} references unknown patient {id}"));
            }
        };
        check(names::PHARMACY_INSURANCE, &mut dataset.insurance.iter().map(|r| r.patient_id));
        check(names::PHARMACY_PRESCRIPTIONS, &mut dataset.prescriptions.iter().map(|r| r.patient_id));
        check(names::PHARMACY_TRANSACTIONS, &mut dataset.transactions.iter().map(|r| r.patient_id));
        check(names::EHR_DIAGNOSES, &mut dataset.diagnoses.iter().map(|r| r.patient_id));
        check(names::EHR_LABS, &mut dataset.labs.iter().map(|r| r.patient_id));
        check(names::EHR_CLINICAL_NOTES, &mut dataset.clinical_notes.iter().map(|r| r.patient_id));
        check(names::EHR_IMMUNIZATIONS, &mut dataset.immunizations.iter().map(|r| r.patient_id));

        for txn in &dataset.transactions {
            match lineages.get(&txn.rx_number) {
                None => messages.push(format!("{} references unknown {}", txn.transaction_id, txn.rx_number)),
                Some(owner) if *owner != txn.patient_id => messages.push(format!(
                    "{} bills {} for {} owned by {}",
                    txn.transaction_id, txn.patient_id, txn.rx_number, owner
                )),
                Some(_) => {}
            }
        }
        messages
    }

    /// Vaccines are never given before birth or after the reference date,
    /// and adult vaccines only from their minimum age.
    fn immunization_age_eligibility(&self, dataset: &Dataset) -> Vec<String> {
        let patients = patient_index(&dataset.patients);
        let min_ages: HashMap<&str, u32> = self
            .catalog
            .immunizations()
            .adult
            .iter()
            .map(|v| (v.vaccine_name.as_str(), v.min_age))
            .collect();

        let mut messages = Vec::new();
        for shot in &dataset.immunizations {
            let Some(patient) = patients.get(&shot.patient_id) else {
                continue;
            };
            let date = shot.administration_date;
            if date < patient.date_of_birth || date > self.reference_date {
                messages.push(format!(
                    "{} received {} on {}, outside {}..={}",
                    patient.patient_id, shot.vaccine_name, date, patient.date_of_birth, self.reference_date
                ));
                continue;
            }
            if let Some(&min_age) = min_ages.get(shot.vaccine_name.as_str()) {
                let age = age_on(patient.date_of_birth, date);
                if age < min_age {
                    messages.push(format!(
                        "{} received {} at age {age}, minimum is {min_age}",
                        patient.patient_id, shot.vaccine_name
                    ));
                }
            }
        }
        messages
    }
}

fn patient_index(patients: &[Patient]) -> HashMap<PatientId, &Patient> {
    patients.iter().map(|p| (p.patient_id, p)).collect()
}

/// Turn one rule's messages into failures, summarizing past the cap.
fn collect_failures(rule_id: &str, messages: Vec<String>, failures: &mut Vec<VerificationFailure>) {
    let total = messages.len();
    for message in messages.into_iter().take(MAX_FAILURES_PER_RULE) {
        warn!(rule_id = %rule_id, %message, "dataset rule failed");
        failures.push(VerificationFailure {
            rule_id: rule_id.to_string(),
            message,
        });
    }
    if total > MAX_FAILURES_PER_RULE {
        failures.push(VerificationFailure {
            rule_id: rule_id.to_string(),
            message: format!("... and {} more", total - MAX_FAILURES_PER_RULE),
        });
    }
}

impl Verifier for DatasetVerifier {
    /// Run every built-in rule, then every custom rule.
    fn verify(&self, dataset: &Dataset) -> MedsynthResult<VerificationReport> {
        let mut failures = Vec::new();
        let mut rules_run = Vec::new();

        for (rule_id, rule) in BUILTIN_RULES {
            debug!(rule_id = %rule_id, "evaluating dataset rule");
            collect_failures(rule_id, rule(self, dataset), &mut failures);
            rules_run.push(rule_id.to_string());
        }

        for (rule_id, rule) in &self.custom_rules {
            debug!(rule_id = %rule_id, "evaluating custom dataset rule");
            collect_failures(rule_id, rule(dataset), &mut failures);
            rules_run.push(rule_id.clone());
        }

        let passed = failures.is_empty();
        debug!(
            passed,
            rules = rules_run.len(),
            failure_count = failures.len(),
            "verification complete"
        );

        Ok(VerificationReport {
            passed,
            rules_run,
            failures,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

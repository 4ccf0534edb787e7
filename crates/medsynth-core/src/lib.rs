//! # medsynth-core
//!
//! The deterministic, seed-driven generation runtime for medsynth.
//!
//! This crate provides:
//! - Seeded random streams (`rng`), one per stage and patient
//! - The four generation stages (`stages`)
//! - The `TableSink` trait that receives rendered tables
//! - The `Generator` that wires stages and sink together in order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medsynth_core::{Generator, traits::TableSink};
//!
//! let generator = Generator::new(config, catalog)?;
//! let dataset = generator.run(&sink)?;
//! ```

pub mod generator;
pub mod identity;
pub mod rng;
pub mod stages;
pub mod summary;
pub mod traits;

pub use generator::Generator;
pub use summary::DatasetSummary;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::Rng;

    use medsynth_catalog::{AgeBracket, Catalog, GenderWeights, SimulationConfig};
    use medsynth_contracts::{
        ids::PatientId,
        patient::{age_on, Gender},
    };

    use crate::{
        rng::{make_rng, patient_rng},
        stages::{
            assignment::assign,
            clinical::{abnormal_value, normal_value},
            population::{birth_date, generate_population, sample_age, sample_gender},
            round2,
        },
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draws(seed: u64, id: &str, n: usize) -> Vec<u64> {
        let mut rng = make_rng(seed, id);
        (0..n).map(|_| rng.gen()).collect()
    }

    // ── Random streams ────────────────────────────────────────────────────────

    #[test]
    fn streams_are_reproducible() {
        assert_eq!(draws(42, "population/PT00001", 8), draws(42, "population/PT00001", 8));
    }

    #[test]
    fn streams_differ_by_seed_and_id() {
        let base = draws(42, "population/PT00001", 8);
        assert_ne!(base, draws(43, "population/PT00001", 8), "seed must change the stream");
        assert_ne!(base, draws(42, "population/PT00002", 8), "id must change the stream");
        assert_ne!(base, draws(42, "assignment/PT00001", 8), "stage must change the stream");
    }

    #[test]
    fn patient_stream_uses_formatted_id() {
        let mut a = patient_rng(42, "clinical", PatientId(7));
        let mut b = make_rng(42, "clinical/PT00007");
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    // ── Population sampling ───────────────────────────────────────────────────

    #[test]
    fn birth_date_reproduces_target_age() {
        let reference = day(2026, 1, 27);
        let mut rng = make_rng(1, "birth");
        for age in [0, 1, 17, 18, 45, 64, 65, 90] {
            for _ in 0..50 {
                let dob = birth_date(&mut rng, age, reference);
                assert_eq!(age_on(dob, reference), age, "dob {dob} should give age {age}");
            }
        }
    }

    #[test]
    fn sampled_ages_stay_inside_brackets() {
        let brackets = [
            AgeBracket { min_age: 0, max_age: 17, weight: 1.0 },
            AgeBracket { min_age: 65, max_age: 90, weight: 3.0 },
        ];
        let mut rng = make_rng(3, "ages");
        for _ in 0..500 {
            let age = sample_age(&mut rng, &brackets);
            assert!(age <= 17 || (65..=90).contains(&age), "age {age} outside every bracket");
        }
    }

    #[test]
    fn zero_weight_gender_is_never_drawn() {
        let weights = GenderWeights { male: 1.0, female: 1.0, other: 0.0 };
        let mut rng = make_rng(5, "gender");
        for _ in 0..500 {
            assert_ne!(sample_gender(&mut rng, &weights), Gender::Other);
        }
    }

    #[test]
    fn population_gender_split_is_roughly_ninety_ten() {
        let config = SimulationConfig::default().with_overrides(Some(2000), Some(42));
        let catalog = Catalog::default_catalog().unwrap();
        let patients = generate_population(&config, &catalog);
        let other = patients.iter().filter(|p| p.gender == Gender::Other).count() as f64;
        let share = other / patients.len() as f64;
        assert!((0.07..=0.13).contains(&share), "non-binary share {share} too far from 0.10");
    }

    // ── Condition prevalence ──────────────────────────────────────────────────

    #[test]
    fn prevalence_tracks_expected_rate_within_five_points() {
        let config = SimulationConfig::default().with_overrides(Some(2000), Some(42));
        let catalog = Catalog::default_catalog().unwrap();
        let patients = generate_population(&config, &catalog);
        let assignments: Vec<_> = patients.iter().map(|p| assign(p, &catalog, &config)).collect();
        let n = patients.len() as f64;

        for condition in catalog.conditions() {
            let expected: f64 = patients
                .iter()
                .map(|p| condition.inclusion_probability(p.age, p.gender))
                .sum::<f64>()
                / n;
            let observed = assignments
                .iter()
                .filter(|a| a.conditions.contains(&condition.name))
                .count() as f64
                / n;
            assert!(
                (observed - expected).abs() <= 0.05,
                "{}: observed {observed:.3}, expected {expected:.3}",
                condition.name
            );
        }
    }

    #[test]
    fn regimen_medications_come_from_their_condition() {
        let config = SimulationConfig::default().with_overrides(Some(300), Some(9));
        let catalog = Catalog::default_catalog().unwrap();
        for patient in generate_population(&config, &catalog) {
            let assignment = assign(&patient, &catalog, &config);
            for condition in &assignment.conditions {
                assert!(
                    assignment.regimen.iter().any(|e| &e.condition == condition),
                    "{condition} has no medication"
                );
            }
            for entry in &assignment.regimen {
                let spec = catalog.condition(&entry.condition).unwrap();
                assert!(spec.medications.contains(&entry.medication));
            }
        }
    }

    // ── Lab values ────────────────────────────────────────────────────────────

    #[test]
    fn abnormal_values_fall_outside_the_range() {
        let mut rng = make_rng(11, "labs");
        for (low, high) in [(70.0, 100.0), (0.0, 5.7), (0.6, 1.2), (0.01, 0.02), (4.0, 4.0)] {
            for _ in 0..200 {
                let v = abnormal_value(&mut rng, low, high);
                assert!(v < low || v > high, "{v} inside [{low}, {high}]");
                assert_eq!(v, round2(v), "{v} not rounded to two decimals");
            }
        }
    }

    #[test]
    fn zero_low_bound_only_goes_above() {
        let mut rng = make_rng(12, "labs");
        for _ in 0..200 {
            assert!(abnormal_value(&mut rng, 0.0, 200.0) > 200.0);
        }
    }

    #[test]
    fn normal_values_fall_inside_the_range() {
        let mut rng = make_rng(13, "labs");
        for (low, high) in [(70.0, 100.0), (0.0, 5.7), (0.6, 1.2), (4.0, 4.0)] {
            for _ in 0..200 {
                let v = normal_value(&mut rng, low, high);
                assert!(v >= low && v <= high, "{v} outside [{low}, {high}]");
            }
        }
    }
}

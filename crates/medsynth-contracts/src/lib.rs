//! # medsynth-contracts
//!
//! Shared record types, table schemas, and errors for the medsynth
//! synthetic healthcare data generator.
//!
//! All crates in the workspace import from here. No sampling logic lives in
//! this crate. It holds data definitions, identifier formatting and the
//! tabular projection that forms the interchange contract.

pub mod clinical;
pub mod error;
pub mod ids;
pub mod patient;
pub mod pharmacy;
pub mod run;
pub mod table;
pub mod verify;

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use clinical::{parse_reference_range, LabFlag, LabResult};
    use error::MedsynthError;
    use ids::{Cents, NoteId, PatientId, RxNumber, TransactionId};
    use patient::{age_on, Gender, Patient};
    use pharmacy::{Adjudication, InsuranceTransaction};
    use table::{names, Dataset, Table};

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_patient(seq: u32, conditions: &[&str]) -> Patient {
        Patient {
            patient_id: PatientId(seq),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            date_of_birth: day(1960, 6, 15),
            age: 65,
            gender: Gender::Female,
            ssn: "123-45-6789".to_string(),
            phone: "(555) 555-1234".to_string(),
            email: "ada.lovelace@example.com".to_string(),
            address: "1 Analytical Way".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
            drug_allergies: Vec::new(),
            food_allergies: vec!["Peanuts".to_string()],
            created_date: day(2024, 1, 1),
        }
    }

    // ── Identifiers ──────────────────────────────────────────────────────────

    #[test]
    fn ids_render_with_fixed_width_prefixes() {
        assert_eq!(PatientId(1).to_string(), "PT00001");
        assert_eq!(PatientId(250).to_string(), "PT00250");
        assert_eq!(RxNumber(42).to_string(), "RX00000042");
        assert_eq!(TransactionId(7).to_string(), "TXN0000007");
        assert_eq!(NoteId(12).to_string(), "NOTE00000012");
    }

    #[test]
    fn cents_render_as_dollars() {
        assert_eq!(Cents(0).to_string(), "0.00");
        assert_eq!(Cents(5).to_string(), "0.05");
        assert_eq!(Cents(12_345).to_string(), "123.45");
        assert_eq!(Cents::from_dollars(75).to_string(), "75.00");
        assert_eq!(Cents(100).saturating_sub(Cents(250)), Cents::ZERO);
    }

    // ── Age ──────────────────────────────────────────────────────────────────

    #[test]
    fn age_counts_completed_years_only() {
        let dob = day(2000, 3, 10);
        assert_eq!(age_on(dob, day(2026, 3, 9)), 25);
        assert_eq!(age_on(dob, day(2026, 3, 10)), 26);
        assert_eq!(age_on(dob, day(1999, 1, 1)), 0);
    }

    // ── Lab ranges ───────────────────────────────────────────────────────────

    #[test]
    fn reference_range_round_trips_through_text() {
        let lab = LabResult {
            patient_id: PatientId(1),
            order_date: day(2024, 5, 1),
            collection_date: day(2024, 5, 1),
            result_date: day(2024, 5, 2),
            test_name: "Cardiac Markers".to_string(),
            test_component: "Troponin".to_string(),
            result_value: 0.05,
            unit: "ng/mL".to_string(),
            reference_low: 0.0,
            reference_high: 0.04,
            flag: LabFlag::Abnormal,
            ordering_provider_npi: "1234567890".to_string(),
            performing_lab: "LabCorp".to_string(),
        };
        assert_eq!(lab.reference_range(), "0-0.04");
        assert_eq!(parse_reference_range(&lab.reference_range()), Some((0.0, 0.04)));
        assert!(!lab.within_reference_range());
    }

    // ── Tables ───────────────────────────────────────────────────────────────

    #[test]
    fn pharmacy_and_ehr_patient_tables_share_ids() {
        let dataset = Dataset {
            patients: vec![make_patient(1, &["Hypertension"]), make_patient(2, &[])],
            ..Dataset::default()
        };
        let tables = dataset.tables();
        let pharmacy = tables.iter().find(|t| t.name == names::PHARMACY_PATIENTS).unwrap();
        let ehr = tables.iter().find(|t| t.name == names::EHR_PATIENTS).unwrap();

        assert_eq!(pharmacy.column("patient_id"), ehr.column("patient_id"));
        assert_eq!(pharmacy.column("conditions"), vec!["Hypertension", "None"]);
        assert_eq!(pharmacy.column("drug_allergies"), vec!["NKDA", "NKDA"]);
        assert!(ehr.column_index("conditions").is_none());
    }

    #[test]
    fn dataset_renders_nine_tables_in_fixed_order() {
        let names: Vec<String> = Dataset::default().tables().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "pharmacy_patients",
                "pharmacy_insurance",
                "pharmacy_prescriptions",
                "pharmacy_transactions",
                "ehr_patients",
                "ehr_diagnoses",
                "ehr_labs",
                "ehr_clinical_notes",
                "ehr_immunizations",
            ]
        );
    }

    #[test]
    fn rejected_transaction_row_carries_code_and_message() {
        let txn = InsuranceTransaction {
            transaction_id: TransactionId(1),
            rx_number: RxNumber(1),
            patient_id: PatientId(1),
            fill_date: day(2024, 2, 1),
            rx_bin: "610020".to_string(),
            rx_pcn: "CHOICE".to_string(),
            rx_group: "CV12345".to_string(),
            cardholder_id: "123456789".to_string(),
            ndc: "00093-7214-01".to_string(),
            quantity: 30,
            days_supply: 30,
            submitted_amount: Cents(12_000),
            paid_amount: Cents::ZERO,
            patient_pay: Cents::ZERO,
            adjudication: Adjudication::Rejected {
                code: "79".to_string(),
                message: "Refill Too Soon".to_string(),
            },
            submission_clarification_code: None,
            transaction_timestamp: NaiveDateTime::parse_from_str(
                "2024-02-01 09:30:00",
                "%Y-%m-%d %H:%M:%S",
            )
            .unwrap(),
        };
        let table = Table::from_records(names::PHARMACY_TRANSACTIONS, [&txn]);

        assert_eq!(table.column("status"), vec!["Rejected"]);
        assert_eq!(table.column("reject_code"), vec!["79"]);
        assert_eq!(table.column("paid_amount"), vec!["0.00"]);
        assert_eq!(table.column("transaction_timestamp"), vec!["2024-02-01T09:30:00"]);
    }

    // ── Error display messages ───────────────────────────────────────────────

    #[test]
    fn error_config_error_display() {
        let err = MedsynthError::ConfigError {
            reason: "population_size must be positive".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("population_size"));
    }

    #[test]
    fn error_catalog_error_display() {
        let err = MedsynthError::CatalogError {
            reason: "unknown medication 'Aspirin'".to_string(),
        };
        assert!(err.to_string().contains("catalog error"));
    }

    #[test]
    fn error_output_error_display() {
        let err = MedsynthError::OutputError {
            reason: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("output error"));
        assert!(msg.contains("disk full"));
    }
}

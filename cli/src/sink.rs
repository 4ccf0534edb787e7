//! CSV directory sink: one `<table>.csv` per table plus `manifest.json`.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, info};

use medsynth_audit::{DatasetManifest, ManifestBuilder};
use medsynth_contracts::{
    error::{MedsynthError, MedsynthResult},
    run::RunInfo,
    table::Table,
};
use medsynth_core::traits::TableSink;

pub const MANIFEST_FILE: &str = "manifest.json";

fn output_error(context: impl std::fmt::Display, e: impl std::fmt::Display) -> MedsynthError {
    MedsynthError::OutputError {
        reason: format!("{context}: {e}"),
    }
}

/// Writes each table as a headed CSV file and chains it into the manifest.
pub struct CsvDirectorySink {
    dir: PathBuf,
    builder: Mutex<ManifestBuilder>,
    manifest: Mutex<Option<DatasetManifest>>,
}

impl CsvDirectorySink {
    /// Create the output directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> MedsynthResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| output_error(format!("cannot create {}", dir.display()), e))?;
        Ok(Self {
            dir,
            builder: Mutex::new(ManifestBuilder::new()),
            manifest: Mutex::new(None),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }

    /// The manifest written by `finalize`, if it has run.
    pub fn manifest(&self) -> MedsynthResult<Option<DatasetManifest>> {
        let manifest = self.manifest.lock().map_err(|e| output_error("manifest lock poisoned", e))?;
        Ok(manifest.clone())
    }
}

impl TableSink for CsvDirectorySink {
    fn write_table(&self, table: &Table) -> MedsynthResult<()> {
        let path = self.table_path(&table.name);
        let mut writer =
            csv::Writer::from_path(&path).map_err(|e| output_error(format!("cannot open {}", path.display()), e))?;

        writer
            .write_record(&table.columns)
            .map_err(|e| output_error(format!("cannot write {}", path.display()), e))?;
        for row in &table.rows {
            writer
                .write_record(row)
                .map_err(|e| output_error(format!("cannot write {}", path.display()), e))?;
        }
        writer
            .flush()
            .map_err(|e| output_error(format!("cannot flush {}", path.display()), e))?;

        self.builder
            .lock()
            .map_err(|e| output_error("manifest lock poisoned", e))?
            .append(table)?;

        debug!(path = %path.display(), rows = table.rows.len(), "table written");
        Ok(())
    }

    fn finalize(&self, run: &RunInfo) -> MedsynthResult<()> {
        let manifest = self
            .builder
            .lock()
            .map_err(|e| output_error("manifest lock poisoned", e))?
            .build(run);

        let path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| output_error("cannot serialize manifest", e))?;
        fs::write(&path, json).map_err(|e| output_error(format!("cannot write {}", path.display()), e))?;

        info!(
            path = %path.display(),
            terminal_hash = %manifest.terminal_hash,
            "manifest written"
        );

        *self.manifest.lock().map_err(|e| output_error("manifest lock poisoned", e))? = Some(manifest);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use medsynth_audit::{verify_tables, DatasetManifest};
    use medsynth_catalog::{Catalog, SimulationConfig};
    use medsynth_contracts::table::{names, Table};
    use medsynth_core::Generator;

    use super::{CsvDirectorySink, MANIFEST_FILE};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn make_generator(seed: u64) -> Generator {
        let config = SimulationConfig::default().with_overrides(Some(15), Some(seed));
        Generator::new(config, Catalog::default_catalog().unwrap()).unwrap()
    }

    fn read_table(sink: &CsvDirectorySink, name: &str) -> Table {
        let mut reader = csv::Reader::from_path(sink.table_path(name)).unwrap();
        let columns = reader.headers().unwrap().iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        Table {
            name: name.to_string(),
            columns,
            rows,
        }
    }

    fn read_manifest(sink: &CsvDirectorySink) -> DatasetManifest {
        let json = fs::read_to_string(sink.dir().join(MANIFEST_FILE)).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_writes_all_tables_and_manifest() {
        let tmp = TempDir::new().unwrap();
        let sink = CsvDirectorySink::new(tmp.path().join("out")).unwrap();
        make_generator(42).run(&sink).unwrap();

        for name in [
            names::PHARMACY_PATIENTS,
            names::PHARMACY_INSURANCE,
            names::PHARMACY_PRESCRIPTIONS,
            names::PHARMACY_TRANSACTIONS,
            names::EHR_PATIENTS,
            names::EHR_DIAGNOSES,
            names::EHR_LABS,
            names::EHR_CLINICAL_NOTES,
            names::EHR_IMMUNIZATIONS,
        ] {
            assert!(sink.table_path(name).exists(), "{name}.csv must be written");
        }

        let manifest = read_manifest(&sink);
        assert_eq!(manifest.tables.len(), 9);
        assert_eq!(manifest.run.seed, 42);
        assert_eq!(Some(manifest.clone()), sink.manifest().unwrap());
    }

    #[test]
    fn test_csv_round_trips_through_manifest() {
        let tmp = TempDir::new().unwrap();
        let sink = CsvDirectorySink::new(tmp.path()).unwrap();
        let dataset = make_generator(42).run(&sink).unwrap();

        let manifest = read_manifest(&sink);
        let tables: Vec<Table> = manifest.tables.iter().map(|e| read_table(&sink, &e.table)).collect();
        assert_eq!(tables, dataset.tables(), "CSV contents must match the in-memory tables");
        assert!(verify_tables(&manifest.tables, &tables).unwrap());
    }

    #[test]
    fn test_patient_csv_header_and_ids() {
        let tmp = TempDir::new().unwrap();
        let sink = CsvDirectorySink::new(tmp.path()).unwrap();
        make_generator(42).run(&sink).unwrap();

        let patients = read_table(&sink, names::EHR_PATIENTS);
        assert_eq!(patients.columns[0], "patient_id");
        assert_eq!(patients.columns.last().map(String::as_str), Some("created_date"));
        assert_eq!(patients.rows.len(), 15);
        assert_eq!(patients.rows[0][0], "PT00001");
        assert_eq!(patients.rows[14][0], "PT00015");
    }

    #[test]
    fn test_same_seed_writes_identical_files() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let sink_a = CsvDirectorySink::new(a.path()).unwrap();
        let sink_b = CsvDirectorySink::new(b.path()).unwrap();
        make_generator(9).run(&sink_a).unwrap();
        make_generator(9).run(&sink_b).unwrap();

        for name in [names::PHARMACY_TRANSACTIONS, names::EHR_CLINICAL_NOTES, MANIFEST_FILE] {
            let file = |dir: &std::path::Path| {
                let path = if name == MANIFEST_FILE { dir.join(name) } else { dir.join(format!("{name}.csv")) };
                fs::read(path).unwrap()
            };
            assert_eq!(file(a.path()), file(b.path()), "{name} must be byte-identical");
        }
    }

    #[test]
    fn test_unwritable_directory_is_an_output_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        match CsvDirectorySink::new(blocker.join("out")) {
            Err(medsynth_contracts::error::MedsynthError::OutputError { reason }) => {
                assert!(reason.contains("cannot create"), "unexpected reason: {reason}")
            }
            Err(other) => panic!("expected OutputError, got {:?}", other),
            Ok(_) => panic!("expected OutputError, got a sink"),
        }
    }
}

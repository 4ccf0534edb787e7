//! medsynth: synthetic pharmacy and EHR dataset generator CLI.
//!
//! Generates a seeded population, assigns chronic conditions, and writes
//! the pharmacy-system and EHR-system tables as CSV files.
//!
//! Usage:
//!   cargo run -p medsynth -- generate --out data
//!   cargo run -p medsynth -- generate --out data --patients 1000 --seed 7
//!   cargo run -p medsynth -- check --patients 1000
//!   cargo run -p medsynth -- catalog

mod sink;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use medsynth_audit::InMemoryTableSink;
use medsynth_catalog::{Catalog, SimulationConfig};
use medsynth_contracts::error::{MedsynthError, MedsynthResult};
use medsynth_core::{traits::Verifier, DatasetSummary, Generator};
use medsynth_verify::{prevalence_report, DatasetVerifier, DEFAULT_TOLERANCE};

use crate::sink::CsvDirectorySink;

// ── CLI definition ────────────────────────────────────────────────────────────

/// medsynth: seeded synthetic pharmacy and EHR data.
///
/// Both record systems are projections of one shared patient population,
/// so patient ids and conditions agree across every table.
#[derive(Parser)]
#[command(
    name = "medsynth",
    about = "Seeded synthetic pharmacy and EHR dataset generator",
    long_about = "Generates a synthetic patient population with chronic conditions,\n\
                  pharmacy fills and claims, and EHR diagnoses, labs, notes, and\n\
                  immunizations. Same seed and population size give identical output."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Where the simulation parameters come from.
#[derive(Args)]
struct SourceArgs {
    /// Simulation config TOML. Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Catalog TOML replacing the built-in catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Population size, overriding the config file.
    #[arg(long)]
    patients: Option<usize>,
    /// Master seed, overriding the config file.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the dataset and write nine CSV tables plus manifest.json.
    Generate {
        /// Output directory, created if missing.
        #[arg(long, default_value = "data")]
        out: PathBuf,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Generate in memory and check every consistency rule.
    Check {
        #[command(flatten)]
        source: SourceArgs,
        /// Allowed absolute gap between observed and expected prevalence.
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
    },
    /// Validate a catalog and list its contents.
    Catalog {
        /// Catalog TOML. The built-in catalog when omitted.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for per-patient output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Generate { out, source } => run_generate(out, &source),
        Command::Check { source, tolerance } => run_check(&source, tolerance),
        Command::Catalog { catalog } => run_catalog(catalog),
    };

    if let Err(e) = result {
        eprintln!("medsynth: {}", e);
        std::process::exit(1);
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

fn load_catalog(path: Option<&PathBuf>) -> MedsynthResult<Catalog> {
    match path {
        Some(path) => Catalog::from_file(path),
        None => Catalog::default_catalog(),
    }
}

fn load_generator(source: &SourceArgs) -> MedsynthResult<Generator> {
    let config = match &source.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    }
    .with_overrides(source.patients, source.seed);
    Generator::new(config, load_catalog(source.catalog.as_ref())?)
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_generate(out: PathBuf, source: &SourceArgs) -> MedsynthResult<()> {
    let generator = load_generator(source)?;
    let sink = CsvDirectorySink::new(out)?;
    let dataset = generator.run(&sink)?;

    print_summary(&generator, &DatasetSummary::from_dataset(&dataset));
    println!("Output: {}", sink.dir().display());
    if let Some(manifest) = sink.manifest()? {
        println!("Dataset fingerprint: {}", manifest.terminal_hash);
    }
    Ok(())
}

fn run_check(source: &SourceArgs, tolerance: f64) -> MedsynthResult<()> {
    let generator = load_generator(source)?;

    // Two independent runs must seal to the same fingerprint.
    let first = InMemoryTableSink::new();
    let second = InMemoryTableSink::new();
    let dataset = generator.run(&first)?;
    generator.run(&second)?;
    let fingerprint = |sink: &InMemoryTableSink| -> MedsynthResult<String> {
        Ok(sink.manifest()?.map(|m| m.terminal_hash).unwrap_or_default())
    };
    let reproducible = fingerprint(&first)? == fingerprint(&second)? && first.verify_integrity()?;

    let verifier = DatasetVerifier::new(generator.catalog().clone(), generator.config().reference_date);
    let report = verifier.verify(&dataset)?;
    let prevalence = prevalence_report(&dataset, generator.catalog(), tolerance);

    print_summary(&generator, &DatasetSummary::from_dataset(&dataset));

    println!("Reproducibility: {}", if reproducible { "PASS" } else { "FAIL" });
    println!("Rules ({} run): {}", report.rules_run.len(), if report.passed { "PASS" } else { "FAIL" });
    for failure in &report.failures {
        println!("  [{}] {}", failure.rule_id, failure.message);
    }

    println!("Prevalence (tolerance ±{:.1} pp):", tolerance * 100.0);
    for row in &prevalence.conditions {
        let marker = if row.deviation() > tolerance { "  <-- outside tolerance" } else { "" };
        println!(
            "  {:<30} observed {:>5.1}%  expected {:>5.1}%{}",
            row.condition,
            row.observed * 100.0,
            row.expected * 100.0,
            marker
        );
    }

    let mut problems = Vec::new();
    if !reproducible {
        problems.push("two runs with the same seed produced different datasets".to_string());
    }
    if !report.passed {
        problems.push(format!("{} rule failure(s)", report.failures.len()));
    }
    let outliers: Vec<&str> = prevalence.outliers().map(|c| c.condition.as_str()).collect();
    if !outliers.is_empty() {
        problems.push(format!("prevalence outside tolerance for {}", outliers.join(", ")));
    }

    if problems.is_empty() {
        println!("All checks passed.");
        Ok(())
    } else {
        Err(MedsynthError::VerificationFailed {
            reason: problems.join("; "),
        })
    }
}

fn run_catalog(path: Option<PathBuf>) -> MedsynthResult<()> {
    let catalog = load_catalog(path.as_ref())?;

    println!("Conditions ({}):", catalog.conditions().len());
    for condition in catalog.conditions() {
        let medications: Vec<String> = condition
            .medications
            .iter()
            .map(|m| if catalog.is_rems(m) { format!("{m} [REMS]") } else { m.clone() })
            .collect();
        println!(
            "  {:<30} {:<8} {:>5.1}%  {}",
            condition.name,
            condition.icd10,
            condition.prevalence * 100.0,
            medications.join(", ")
        );
    }

    println!();
    println!("Carriers ({}):", catalog.carriers().len());
    for carrier in catalog.carriers() {
        println!("  {:<30} BIN {}  PCN {}", carrier.name, carrier.bin, carrier.pcn);
    }

    println!();
    println!("Reject codes ({}):", catalog.reject_codes().len());
    for reject in catalog.reject_codes() {
        println!("  {:>3}  {}", reject.code, reject.message);
    }
    Ok(())
}

// ── Summary ───────────────────────────────────────────────────────────────────

fn print_summary(generator: &Generator, summary: &DatasetSummary) {
    let config = generator.config();
    println!();
    println!("medsynth dataset");
    println!("================");
    println!(
        "Seed {}  |  window {} .. {}",
        config.seed, config.window_start, config.window_end
    );
    println!();
    println!("Pharmacy system");
    println!("  Patients:           {}", summary.patients);
    println!("  With conditions:    {}", summary.patients_with_conditions);
    println!("  Insurance profiles: {}", summary.insurance_profiles);
    println!(
        "  Prescriptions:      {}  (REMS {}, dosing errors {})",
        summary.prescriptions, summary.rems_prescriptions, summary.dosing_errors
    );
    println!(
        "  Transactions:       {}  (rejected {:.1}%)",
        summary.transactions,
        summary.reject_percent()
    );
    println!();
    println!("EHR system");
    println!("  Diagnoses:          {}", summary.diagnoses);
    println!(
        "  Lab results:        {}  (abnormal {:.1}%)",
        summary.labs,
        summary.abnormal_lab_percent()
    );
    println!("  Clinical notes:     {}", summary.clinical_notes);
    for (note_type, count) in &summary.notes_by_type {
        println!("    {:<16}  {}", note_type, count);
    }
    println!("  Immunizations:      {}", summary.immunizations);
    println!();
}

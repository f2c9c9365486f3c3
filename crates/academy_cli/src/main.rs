//! Seeds both academy stores from a fixture and prints demonstration queries.
//!
//! # Responsibility
//! - Resolve configuration from a JSON file and command-line overrides.
//! - Drive the enrollment service against the relational and document
//!   stores, then print an update/search result and a relationship join.

use academy_core::{
    collections, core_version, default_log_level, flush_logging, init_logging, Assignments,
    Conditions, DocumentManager, EnrollmentService, Fixture, LogTarget, Relationships,
    SeedReport, SqlRow, SqliteManager, StoreConfig, Table,
};
use clap::Parser;
use log::info;
use rusqlite::types::Value;
use std::error::Error;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "academy", version, about = "Seed and query the academy demo stores")]
struct Cli {
    /// Fixture with `advisors` and `students` lists.
    #[arg(long, default_value = "data.json")]
    fixture: PathBuf,

    /// JSON store configuration; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    sqlite_path: Option<PathBuf>,

    #[arg(long)]
    document_root: Option<PathBuf>,

    /// Advisors each student should end up with.
    #[arg(long)]
    quota: Option<u32>,

    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rotating log files; stderr when omitted.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);
    flush_logging();
    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    let target = cli
        .log_dir
        .clone()
        .map_or(LogTarget::Stderr, LogTarget::Directory);
    init_logging(&level, target)?;
    info!("event=cli_start module=cli status=ok version={}", core_version());

    let config = resolve_config(&cli)?;
    let fixture = Fixture::load(&cli.fixture)?;

    let relational = seed_relational(&config, &fixture)?;
    print_report("relational", relational);

    let documents = seed_documents(&config, &fixture)?;
    print_report("document", documents);

    info!("event=cli_finish module=cli status=ok");
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<StoreConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(path) = &cli.sqlite_path {
        config.sqlite_path = path.clone();
    }
    if let Some(root) = &cli.document_root {
        config.document_root = root.clone();
    }
    if let Some(quota) = cli.quota {
        config.advisor_quota = quota;
    }
    config.validate()?;
    Ok(config)
}

fn seed_relational(config: &StoreConfig, fixture: &Fixture) -> Result<SeedReport, Box<dyn Error>> {
    let mut manager = SqliteManager::open(&config.sqlite_path)?;
    manager.create_schema()?;

    let report = EnrollmentService::new(&manager).seed(fixture, config.advisor_quota)?;

    manager.update(
        Table::Students,
        &Assignments::new()
            .eq("name", "Jason".to_string())
            .eq("surname", "Brody".to_string()),
        &Conditions::new().eq("age", 20_i64),
    )?;
    let rows = manager.search(
        Table::Students,
        &["name", "surname", "age"],
        &Conditions::new().eq("age", 20_i64),
    )?;
    println!("Updated entries in students table:");
    print_rows(&rows);

    manager.close()?;
    Ok(report)
}

fn seed_documents(config: &StoreConfig, fixture: &Fixture) -> Result<SeedReport, Box<dyn Error>> {
    let manager = DocumentManager::open(config.document_database_dir())?;
    for name in collections::ALL {
        manager.ensure_collection(name)?;
    }

    let report = EnrollmentService::new(&manager).seed(fixture, config.advisor_quota)?;

    let relationships = manager.get_relationships(
        collections::ADVISORS,
        collections::STUDENTS,
        "_id",
        "_id",
    )?;
    println!();
    print_relationships(&relationships)?;

    Ok(report)
}

fn print_rows(rows: &[SqlRow]) {
    for row in rows {
        let cells = row.iter().map(format_value).collect::<Vec<_>>();
        println!("  ({})", cells.join(", "));
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Text(text) => format!("'{text}'"),
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

fn print_relationships(relationships: &Relationships) -> Result<(), Box<dyn Error>> {
    println!("Relationships ({} keys):", relationships.len());
    for (key, documents) in relationships.iter() {
        println!("  {key}: {}", serde_json::to_string(documents)?);
    }
    Ok(())
}

fn print_report(store: &str, report: SeedReport) {
    println!(
        "{store} store: {} advisors, {} students, {} links inserted",
        report.advisors_inserted, report.students_inserted, report.links_inserted
    );
}

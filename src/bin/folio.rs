//! Folio CLI: administrative entry points for taxonomy consolidation
//!
//! Usage:
//!   folio activate [--db path] [--config path]
//!   folio admin
//!   folio migrate [--dry-run]
//!   folio status | groups | routes | terms <group> | seed <fixture.yaml>

use clap::{Parser, Subcommand};
use folio::seed::Fixture;
use folio::storage::AdminStore;
use folio::{
    ClassificationStore, FolioConfig, GateOutcome, GroupName, OpenStore, SqliteStore,
    VersionGate,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "Consolidate legacy portfolio taxonomies into one canonical taxonomy"
)]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Path to YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enable the system: register the schema and migrate unconditionally
    Activate,
    /// Evaluate the version gate and refresh guard, as on an admin request
    Admin,
    /// Run one migration pass without touching the version marker
    Migrate {
        /// Only report what would change
        #[arg(long)]
        dry_run: bool,
    },
    /// Show installed version, gate state and refresh guard
    Status,
    /// Load legacy groups, terms and tags from a YAML fixture
    Seed {
        /// Fixture file
        #[arg(required = true)]
        fixture: PathBuf,
    },
    /// List known groups
    Groups,
    /// List the terms of a group
    Terms {
        /// Group name
        group: String,
    },
    /// List the materialized route table
    Routes,
}

/// Per-user data directory (~/.local/share/folio)
fn default_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("folio")
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<FolioConfig, String> {
    let path = path.unwrap_or_else(|| default_dir().join("folio.yaml"));
    FolioConfig::load(&path).map_err(|e| e.to_string())
}

fn open_store(db: Option<PathBuf>) -> Result<Arc<SqliteStore>, String> {
    let db_path = db.unwrap_or_else(|| default_dir().join("folio.db"));
    SqliteStore::open(&db_path)
        .map(Arc::new)
        .map_err(|e| format!("Failed to open database {}: {}", db_path.display(), e))
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn print_outcome(outcome: &GateOutcome, json: bool) -> i32 {
    if json {
        return print_json(outcome);
    }
    println!("State: {} -> {}", outcome.observed, outcome.state);
    if let Some(report) = &outcome.report {
        println!("{}", report);
        for failure in &report.failures {
            println!("  failed: {:?} {} / {}: {}", failure.kind, failure.group, failure.term, failure.message);
        }
    }
    println!("Version marker advanced: {}", outcome.marker_advanced);
    println!("Routes refreshed: {}", outcome.routes_refreshed);
    0
}

fn cmd_activate(gate: &VersionGate, json: bool) -> i32 {
    match gate.on_activate() {
        Ok(outcome) => print_outcome(&outcome, json),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_admin(gate: &VersionGate, json: bool) -> i32 {
    match gate.on_admin_request() {
        Ok(outcome) => print_outcome(&outcome, json),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_migrate(gate: &VersionGate, store: &SqliteStore, dry_run: bool, json: bool) -> i32 {
    let groups = &gate.settings().legacy_groups;
    if dry_run {
        return match gate.migrator().plan(groups) {
            Ok(plan) if json => print_json(&plan),
            Ok(plan) => {
                if plan.is_converged() {
                    println!("Nothing to migrate.");
                }
                for name in &plan.terms_to_create {
                    println!("create term '{}'", name);
                }
                for (name, count) in &plan.tags_to_add {
                    println!("tag {} item(s) with '{}'", count, name);
                }
                for group in &plan.groups_missing {
                    println!("skip missing group {}", group);
                }
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        };
    }

    // Terms can only be created once the canonical group is declared
    if let Err(e) = store.register_schema(&gate.settings().schema) {
        eprintln!("Error: {}", e);
        return 1;
    }
    match gate.migrator().run(groups) {
        Ok(report) if json => print_json(&report),
        Ok(report) => {
            println!("{}", report);
            if report.is_clean() {
                0
            } else {
                2
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_status(gate: &VersionGate, json: bool) -> i32 {
    let status = match gate.status() {
        Ok(status) => status,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if json {
        return print_json(&status);
    }
    println!("Running version:   {}", status.running_version);
    println!(
        "Installed version: {}",
        status.installed_version.as_deref().unwrap_or("(none)")
    );
    println!("State:             {}", status.state);
    match status.guard_expires_at {
        Some(at) if status.guard_active => println!("Refresh guard:     active until {}", at),
        Some(at) => println!("Refresh guard:     expired at {}", at),
        None => println!("Refresh guard:     not set"),
    }
    0
}

fn cmd_seed(store: &SqliteStore, path: &Path, json: bool) -> i32 {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", path.display(), e);
            return 1;
        }
    };
    let fixture = match Fixture::from_yaml(&text) {
        Ok(fixture) => fixture,
        Err(e) => {
            eprintln!("Error: cannot parse '{}': {}", path.display(), e);
            return 1;
        }
    };
    match fixture.apply(store) {
        Ok(report) if json => print_json(&report),
        Ok(report) => {
            println!(
                "Seeded {} group(s), {} term(s), {} tag(s)",
                report.groups_created, report.terms_created, report.tags_added
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_groups(store: &SqliteStore, json: bool) -> i32 {
    let groups = match store.list_groups() {
        Ok(groups) => groups,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if json {
        let rows: Vec<serde_json::Value> = groups
            .iter()
            .map(|(name, label)| serde_json::json!({ "name": name, "label": label }))
            .collect();
        return print_json(&rows);
    }
    for (name, label) in groups {
        println!("{:<32}  {}", name, label);
    }
    0
}

fn cmd_terms(store: &SqliteStore, group: &str, json: bool) -> i32 {
    let terms = match store.list_terms(&GroupName::from(group)) {
        Ok(terms) => terms,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if json {
        return print_json(&terms);
    }
    if terms.is_empty() {
        println!("No terms in {}.", group);
        return 0;
    }
    println!("{:>6}  {:<24}  {:<24}  DESCRIPTION", "ID", "NAME", "SLUG");
    println!("{}", "-".repeat(72));
    for term in terms {
        println!(
            "{:>6}  {:<24}  {:<24}  {}",
            term.id.raw(),
            term.name,
            term.slug,
            term.description
        );
    }
    0
}

fn cmd_routes(store: &SqliteStore, json: bool) -> i32 {
    let routes = match store.list_routes() {
        Ok(routes) => routes,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if json {
        return print_json(&routes);
    }
    if routes.is_empty() {
        println!("Route table is empty.");
        return 0;
    }
    for route in routes {
        println!("{:<48}  {}", route.path, route.query);
    }
    0
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let store = match open_store(cli.db) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let gate = VersionGate::new(store.clone(), config.gate_settings());

    let code = match cli.command {
        Commands::Activate => cmd_activate(&gate, cli.json),
        Commands::Admin => cmd_admin(&gate, cli.json),
        Commands::Migrate { dry_run } => cmd_migrate(&gate, &store, dry_run, cli.json),
        Commands::Status => cmd_status(&gate, cli.json),
        Commands::Seed { fixture } => cmd_seed(&store, &fixture, cli.json),
        Commands::Groups => cmd_groups(&store, cli.json),
        Commands::Terms { group } => cmd_terms(&store, &group, cli.json),
        Commands::Routes => cmd_routes(&store, cli.json),
    };
    std::process::exit(code);
}

//! Fintrack main entry point

use anyhow::Context;
use clap::{Parser, Subcommand};
use fintrack_api::start_server;
use fintrack_config::Config;
use fintrack_core::export::export_file_name;
use fintrack_core::{migrate_sqlite_to_json, Ledger};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::RwLock;

#[derive(Parser, Debug)]
#[command(name = "fintrack")]
#[command(version = "0.1.0")]
#[command(about = "A small personal finance tracker with a web dashboard", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web server (default)
    Serve,
    /// Write one year of records to fintrack-<year>.csv
    Export {
        #[arg(short, long)]
        year: i32,
        /// Output directory, defaults to export.path from the configuration
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Copy a SQLite database into the JSON store at data.path
    Migrate {
        #[arg(long, value_name = "FILE")]
        from_sqlite: PathBuf,
    },
    /// Print the default configuration
    Config,
}

fn init_logging(config: &Config) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str()))
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(Command::Config) = args.command {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let config = Config::load_or_default(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    init_logging(&config);
    if !args.config.exists() {
        log::warn!("Config file {} not found, using defaults", args.config.display());
    }
    log::info!(
        "Config loaded: data path={}, backend={}",
        config.data.path.display(),
        config.data.backend
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config),
        Command::Export { year, out } => export(config, year, out),
        Command::Migrate { from_sqlite } => migrate(&config, &from_sqlite),
        Command::Config => Ok(()),
    }
}

fn serve(config: Config) -> anyhow::Result<()> {
    let rt = Runtime::new()?;

    rt.block_on(async {
        let ledger = Ledger::open(config.clone()).context("Failed to open the data store")?;
        let ledger = Arc::new(RwLock::new(ledger));
        start_server(config, ledger).await.context("Server error")?;
        Ok(())
    })
}

fn export(config: Config, year: i32, out: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = out.unwrap_or_else(|| config.export.path.clone());
    let ledger = Ledger::open(config).context("Failed to open the data store")?;
    let csv = ledger.export_year_csv(year)?;

    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(export_file_name(year));
    std::fs::write(&path, csv).with_context(|| format!("Failed to write {}", path.display()))?;

    log::info!("Exported {} to {}", year, path.display());
    println!("{}", path.display());
    Ok(())
}

fn migrate(config: &Config, from_sqlite: &Path) -> anyhow::Result<()> {
    let summary = migrate_sqlite_to_json(from_sqlite, &config.data.path)
        .with_context(|| format!("Failed to migrate {}", from_sqlite.display()))?;
    println!(
        "Migrated {} categories, {} expenses and {} incomes into {}",
        summary.categories,
        summary.expenses,
        summary.incomes,
        config.data.path.display()
    );
    Ok(())
}

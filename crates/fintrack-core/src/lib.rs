//! Core record keeping and business logic for fintrack

pub mod error;
pub mod export;
pub mod json_store;
pub mod models;
pub mod query;
pub mod recurring;
pub mod reports;
pub mod sqlite_store;
pub mod store;
pub mod types;

use chrono::{Datelike, Local};
use fintrack_config::{Backend, Config};
use fintrack_query::{QueryParser, QueryRequest, Table};
use std::path::Path;

pub use error::{CoreError, CoreResult, ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity};
pub use json_store::JsonStore;
pub use models::{Expense, ExpenseDraft, Income, IncomeDraft};
pub use query::{QueryResult, ToolDescriptor};
pub use recurring::{RecurringOutcome, RecurringRequest};
pub use reports::YearReport;
pub use sqlite_store::SqliteStore;
pub use store::{Snapshot, Store};
pub use types::Frequency;

/// Open the store selected in the configuration
pub fn open_store(config: &Config) -> CoreResult<Box<dyn Store>> {
    let store: Box<dyn Store> = match config.data.backend {
        Backend::Json => Box::new(JsonStore::open(&config.data.path)?),
        Backend::Sqlite => Box::new(SqliteStore::open(config.database_path())?),
    };
    Ok(store)
}

/// Main ledger structure
pub struct Ledger {
    config: Config,
    store: Box<dyn Store>,
}

impl Ledger {
    /// Create a ledger over an already opened store
    pub fn new(config: Config, store: Box<dyn Store>) -> Self {
        Self { config, store }
    }

    /// Open the configured store
    pub fn open(config: Config) -> CoreResult<Self> {
        let store = open_store(&config)?;
        log::info!(
            "Ledger opened with {} store at {}",
            store.backend_name(),
            config.data.path.display()
        );
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    // ==================== Categories ====================

    pub fn categories(&self) -> CoreResult<Vec<String>> {
        self.store.categories()
    }

    pub fn add_category(&mut self, name: &str) -> CoreResult<()> {
        self.store.add_category(name)?;
        log::info!("Added category '{}'", name.trim());
        Ok(())
    }

    pub fn rename_category(&mut self, old: &str, new: &str) -> CoreResult<()> {
        self.store.rename_category(old, new)?;
        log::info!("Renamed category '{}' to '{}'", old, new.trim());
        Ok(())
    }

    pub fn delete_category(&mut self, name: &str) -> CoreResult<()> {
        self.store.delete_category(name)?;
        log::info!("Deleted category '{}'", name);
        Ok(())
    }

    // ==================== Records ====================

    pub fn add_expense(&mut self, draft: ExpenseDraft) -> CoreResult<i64> {
        let id = self.store.add_expense(draft)?;
        log::info!("Added expense {}", id);
        Ok(id)
    }

    pub fn add_income(&mut self, draft: IncomeDraft) -> CoreResult<i64> {
        let id = self.store.add_income(draft)?;
        log::info!("Added income {}", id);
        Ok(id)
    }

    pub fn add_recurring_expense(&mut self, request: RecurringRequest) -> CoreResult<RecurringOutcome> {
        recurring::expand_recurring(self.store.as_mut(), request)
    }

    /// Expenses for a `YYYY` or `YYYY-MM` period, all when `None`
    pub fn expenses(&self, period: Option<&str>) -> CoreResult<Vec<Expense>> {
        if let Some(p) = period {
            models::validate_period(p)?;
        }
        let expenses = self.store.query_expenses(period)?;
        log::debug!("Loaded {} expenses for {:?}", expenses.len(), period);
        Ok(expenses)
    }

    pub fn incomes(&self, period: Option<&str>) -> CoreResult<Vec<Income>> {
        if let Some(p) = period {
            models::validate_period(p)?;
        }
        let incomes = self.store.query_incomes(period)?;
        log::debug!("Loaded {} incomes for {:?}", incomes.len(), period);
        Ok(incomes)
    }

    pub fn delete_expenses(&mut self, ids: &[i64]) -> CoreResult<usize> {
        let removed = self.store.delete_expenses(ids)?;
        log::info!("Deleted {} of {} requested expenses", removed, ids.len());
        Ok(removed)
    }

    pub fn delete_incomes(&mut self, ids: &[i64]) -> CoreResult<usize> {
        let removed = self.store.delete_incomes(ids)?;
        log::info!("Deleted {} of {} requested incomes", removed, ids.len());
        Ok(removed)
    }

    // ==================== Reports ====================

    pub fn year_report(&self, year: i32) -> CoreResult<YearReport> {
        let period = year.to_string();
        let expenses = self.store.query_expenses(Some(&period))?;
        let incomes = self.store.query_incomes(Some(&period))?;
        Ok(reports::year_report(year, &expenses, &incomes))
    }

    pub fn available_years(&self) -> CoreResult<Vec<i32>> {
        let expenses = self.store.query_expenses(None)?;
        let incomes = self.store.query_incomes(None)?;
        Ok(reports::available_years(&expenses, &incomes))
    }

    /// Configured default year, else the latest year with data, else the current year
    pub fn default_year(&self) -> CoreResult<i32> {
        if let Some(year) = self.config.dashboard.default_year {
            return Ok(year);
        }
        Ok(self
            .available_years()?
            .first()
            .copied()
            .unwrap_or_else(|| Local::now().year()))
    }

    pub fn export_year_csv(&self, year: i32) -> CoreResult<Vec<u8>> {
        let period = year.to_string();
        let expenses = self.store.query_expenses(Some(&period))?;
        let incomes = self.store.query_incomes(Some(&period))?;
        export::export_year_csv(year, &expenses, &incomes)
    }

    // ==================== Queries ====================

    pub fn run_query(&self, request: &QueryRequest) -> CoreResult<QueryResult> {
        let max_rows = self.config.agent.max_rows;
        log::debug!("Running query on {}: {:?}", request.table, request);
        match request.table {
            Table::Expenses => {
                let records = self.store.query_expenses(None)?;
                let rows: Vec<&dyn query::QueryRow> = records.iter().map(|r| r as &dyn query::QueryRow).collect();
                query::execute(request, &rows, max_rows)
            }
            Table::Incomes => {
                let records = self.store.query_incomes(None)?;
                let rows: Vec<&dyn query::QueryRow> = records.iter().map(|r| r as &dyn query::QueryRow).collect();
                query::execute(request, &rows, max_rows)
            }
        }
    }

    pub fn run_query_text(&self, text: &str) -> CoreResult<QueryResult> {
        let request = QueryParser::parse(text)?;
        self.run_query(&request)
    }

    /// Agent entry point: always answers with text
    pub fn answer_query(&self, text: &str) -> String {
        query::render_answer(self.run_query_text(text))
    }

    pub fn tool_descriptor(&self) -> ToolDescriptor {
        query::tool_descriptor(self.config.agent.max_rows)
    }
}

/// Counts copied by [`migrate_sqlite_to_json`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSummary {
    pub categories: usize,
    pub expenses: usize,
    pub incomes: usize,
}

/// Copy a SQLite store into a JSON store directory, keeping record ids
pub fn migrate_sqlite_to_json(sqlite_path: &Path, json_dir: &Path) -> CoreResult<MigrationSummary> {
    if !sqlite_path.exists() {
        return Err(CoreError::not_found(format!("database {}", sqlite_path.display())));
    }
    let source = SqliteStore::open(sqlite_path)?;
    let snapshot = source.snapshot()?;
    let summary = MigrationSummary {
        categories: snapshot.categories.len(),
        expenses: snapshot.expenses.len(),
        incomes: snapshot.incomes.len(),
    };

    let mut target = JsonStore::open(json_dir)?;
    target.import_snapshot(snapshot)?;
    log::info!(
        "Migrated {} categories, {} expenses, {} incomes into {}",
        summary.categories,
        summary.expenses,
        summary.incomes,
        json_dir.display()
    );
    Ok(summary)
}

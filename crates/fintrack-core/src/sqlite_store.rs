//! SQLite store
//!
//! Expenses reference categories by name; renaming a category cascades
//! through the foreign key. Every mutation runs in its own transaction.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::models::{Expense, ExpenseDraft, Income, IncomeDraft};
use crate::store::{blocking_reason, clean_category_name, Store, DEFAULT_CATEGORIES};
use crate::types::Frequency;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS expenses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    amount REAL NOT NULL,
    category TEXT NOT NULL REFERENCES categories(name) ON UPDATE CASCADE,
    date TEXT NOT NULL,
    notes TEXT,
    frequency TEXT,
    recurring_id TEXT
);

CREATE TABLE IF NOT EXISTS incomes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    amount REAL NOT NULL,
    date TEXT NOT NULL,
    source TEXT
);
";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn get_connection(db_path: &Path) -> CoreResult<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> CoreResult<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for name in DEFAULT_CATEGORIES {
            conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
        }
    }
    Ok(())
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Raw expense row before conversion
type ExpenseRow = (i64, f64, String, String, Option<String>, Option<String>, Option<String>);

impl SqliteStore {
    /// Open (or create) the database file
    pub fn open(db_path: impl AsRef<Path>) -> CoreResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        log::debug!("Opened SQLite store at {}", db_path.display());
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> CoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CoreError::InternalError {
            message: "database connection lock poisoned".to_string(),
        })
    }

    fn conn_mut(&mut self) -> CoreResult<&mut Connection> {
        self.conn.get_mut().map_err(|_| CoreError::InternalError {
            message: "database connection lock poisoned".to_string(),
        })
    }

    fn category_exists(conn: &Connection, name: &str) -> CoreResult<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT id FROM categories WHERE name = ?1", [name], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }
}

fn amount_to_sql(amount: Decimal) -> CoreResult<f64> {
    amount
        .to_f64()
        .ok_or_else(|| CoreError::validation(format!("Amount {} is out of range", amount)))
}

/// Read back through the shortest decimal text of the float
fn amount_from_sql(value: f64) -> CoreResult<Decimal> {
    Decimal::from_str(&value.to_string())
        .map(|d| d.normalize())
        .map_err(|_| CoreError::IoError { message: format!("stored amount {} is not a number", value) })
}

fn date_from_sql(value: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| CoreError::IoError { message: format!("stored date '{}' is invalid", value) })
}

fn expense_from_row(row: ExpenseRow) -> CoreResult<Expense> {
    let (id, amount, category, date, notes, frequency, recurring_id) = row;
    let frequency = match frequency {
        Some(text) => Some(text.parse::<Frequency>().map_err(|e| CoreError::IoError { message: e })?),
        None => None,
    };
    Ok(Expense {
        id,
        amount: amount_from_sql(amount)?,
        category,
        date: date_from_sql(&date)?,
        notes,
        frequency,
        recurring_group_id: recurring_id,
    })
}

/// `substr` keeps the period match literal, no LIKE wildcards involved
fn period_clause(period: Option<&str>) -> (&'static str, String) {
    match period {
        Some(prefix) => ("WHERE substr(date, 1, length(?1)) = ?1", prefix.to_string()),
        None => ("WHERE ?1 = ''", String::new()),
    }
}

fn delete_ids(conn: &mut Connection, table: &str, ids: &[i64]) -> CoreResult<usize> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let tx = conn.transaction()?;
    let mut removed = 0;
    {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table);
        let mut stmt = tx.prepare(&sql)?;
        for id in &unique {
            removed += stmt.execute([id])?;
        }
    }
    tx.commit()?;
    Ok(removed)
}

impl Store for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn categories(&self) -> CoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM categories ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn add_category(&mut self, name: &str) -> CoreResult<()> {
        let name = clean_category_name(name)?;
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        if Self::category_exists(&tx, &name)? {
            return Err(CoreError::conflict(format!("Category '{}' already exists", name)));
        }
        tx.execute("INSERT INTO categories (name) VALUES (?1)", [&name])?;
        tx.commit()?;
        Ok(())
    }

    fn rename_category(&mut self, old: &str, new: &str) -> CoreResult<()> {
        let new = clean_category_name(new)?;
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        if !Self::category_exists(&tx, old)? {
            return Err(CoreError::not_found(format!("category '{}'", old)));
        }
        if new == old {
            return Ok(());
        }
        if Self::category_exists(&tx, &new)? {
            return Err(CoreError::conflict(format!("Category '{}' already exists", new)));
        }
        tx.execute("UPDATE categories SET name = ?2 WHERE name = ?1", params![old, new])?;
        tx.commit()?;
        Ok(())
    }

    fn delete_category(&mut self, name: &str) -> CoreResult<()> {
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        if !Self::category_exists(&tx, name)? {
            return Err(CoreError::not_found(format!("category '{}'", name)));
        }
        let used: i64 = tx.query_row(
            "SELECT count(*) FROM expenses WHERE category = ?1",
            [name],
            |row| row.get(0),
        )?;
        let total: i64 = tx.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
        if let Some(reason) = blocking_reason(name, used as usize, total as usize) {
            return Err(CoreError::conflict(reason));
        }
        tx.execute("DELETE FROM categories WHERE name = ?1", [name])?;
        tx.commit()?;
        Ok(())
    }

    fn add_expense(&mut self, draft: ExpenseDraft) -> CoreResult<i64> {
        draft.validate()?;
        let amount = amount_to_sql(draft.amount)?;
        let expense = draft.into_expense(0);

        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        tx.execute("INSERT OR IGNORE INTO categories (name) VALUES (?1)", [&expense.category])?;
        tx.execute(
            "INSERT INTO expenses (amount, category, date, notes, frequency, recurring_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                amount,
                expense.category,
                expense.date.format(DATE_FORMAT).to_string(),
                expense.notes,
                expense.frequency.map(|f| f.to_string()),
                expense.recurring_group_id,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    fn add_income(&mut self, draft: IncomeDraft) -> CoreResult<i64> {
        draft.validate()?;
        let amount = amount_to_sql(draft.amount)?;
        let income = draft.into_income(0);

        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO incomes (amount, date, source) VALUES (?1, ?2, ?3)",
            params![amount, income.date.format(DATE_FORMAT).to_string(), income.source],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    fn query_expenses(&self, period: Option<&str>) -> CoreResult<Vec<Expense>> {
        let conn = self.lock()?;
        let (clause, param) = period_clause(period);
        let sql = format!(
            "SELECT id, amount, category, date, notes, frequency, recurring_id FROM expenses {} ORDER BY id",
            clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([param], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<Result<Vec<ExpenseRow>, _>>()?;
        rows.into_iter().map(expense_from_row).collect()
    }

    fn query_incomes(&self, period: Option<&str>) -> CoreResult<Vec<Income>> {
        let conn = self.lock()?;
        let (clause, param) = period_clause(period);
        let sql = format!("SELECT id, amount, date, source FROM incomes {} ORDER BY id", clause);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([param], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, amount, date, source)| {
                Ok(Income {
                    id,
                    amount: amount_from_sql(amount)?,
                    date: date_from_sql(&date)?,
                    source,
                })
            })
            .collect()
    }

    fn delete_expenses(&mut self, ids: &[i64]) -> CoreResult<usize> {
        delete_ids(self.conn_mut()?, "expenses", ids)
    }

    fn delete_incomes(&mut self, ids: &[i64]) -> CoreResult<usize> {
        delete_ids(self.conn_mut()?, "incomes", ids)
    }
}

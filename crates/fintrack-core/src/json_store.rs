//! Flat JSON file store
//!
//! Layout inside the data directory:
//!
//! - `categories.json`: array of category names
//! - `expenses.json` / `incomes.json`: `{"next_id": n, "records": [...]}`
//!
//! Writes go to a temp file in the same directory which is then renamed
//! over the target, so a reader never sees a half-written file.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{CoreError, CoreResult};
use crate::models::{matches_period, validate_amount, Expense, ExpenseDraft, Income, IncomeDraft};
use crate::store::{blocking_reason, clean_category_name, Snapshot, Store, DEFAULT_CATEGORIES};

const CATEGORIES_FILE: &str = "categories.json";
const EXPENSES_FILE: &str = "expenses.json";
const INCOMES_FILE: &str = "incomes.json";

/// Records plus the persisted id counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFile<T> {
    pub next_id: i64,
    pub records: Vec<T>,
}

impl<T> Default for RecordFile<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

impl<T> RecordFile<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

pub struct JsonStore {
    dir: PathBuf,
    categories: Vec<String>,
    expenses: RecordFile<Expense>,
    incomes: RecordFile<Income>,
}

impl JsonStore {
    /// Open the store in `dir`, creating missing files with defaults
    pub fn open(dir: impl AsRef<Path>) -> CoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut store = Self {
            dir,
            categories: Vec::new(),
            expenses: RecordFile::default(),
            incomes: RecordFile::default(),
        };

        let categories: Option<Vec<String>> = store.read_json(CATEGORIES_FILE)?;
        store.categories = match categories {
            Some(list) if !list.is_empty() => list,
            _ => {
                log::info!("Seeding default categories in {}", store.dir.display());
                let defaults: Vec<String> = DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
                store.write_json(CATEGORIES_FILE, &defaults)?;
                defaults
            }
        };

        store.expenses = match store.read_json(EXPENSES_FILE)? {
            Some(file) => file,
            None => {
                let file = RecordFile::default();
                store.write_json(EXPENSES_FILE, &file)?;
                file
            }
        };

        store.incomes = match store.read_json(INCOMES_FILE)? {
            Some(file) => file,
            None => {
                let file = RecordFile::default();
                store.write_json(INCOMES_FILE, &file)?;
                file
            }
        };

        store.register_orphan_categories()?;

        log::debug!(
            "Opened JSON store at {} ({} expenses, {} incomes)",
            store.dir.display(),
            store.expenses.records.len(),
            store.incomes.records.len()
        );
        Ok(store)
    }

    /// Add categories that expenses reference but the category file lacks,
    /// left behind when a rename stopped between its two file replacements
    fn register_orphan_categories(&mut self) -> CoreResult<()> {
        let mut missing: Vec<String> = Vec::new();
        for expense in &self.expenses.records {
            if !self.categories.contains(&expense.category) && !missing.contains(&expense.category) {
                missing.push(expense.category.clone());
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        log::warn!(
            "Registering categories used by expenses but missing from {}: {}",
            CATEGORIES_FILE,
            missing.join(", ")
        );
        let mut categories = self.categories.clone();
        categories.extend(missing);
        self.write_json(CATEGORIES_FILE, &categories)?;
        self.categories = categories;
        Ok(())
    }

    /// Replace the whole contents, keeping ids and moving each counter past the highest id
    pub fn import_snapshot(&mut self, snapshot: Snapshot) -> CoreResult<()> {
        for expense in &snapshot.expenses {
            validate_amount(expense.amount).map_err(|_| {
                CoreError::validation(format!("expense {} has an out-of-range amount {}", expense.id, expense.amount))
            })?;
        }
        for income in &snapshot.incomes {
            validate_amount(income.amount).map_err(|_| {
                CoreError::validation(format!("income {} has an out-of-range amount {}", income.id, income.amount))
            })?;
        }
        let categories = if snapshot.categories.is_empty() {
            DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
        } else {
            snapshot.categories
        };
        let expenses = RecordFile {
            next_id: snapshot.expenses.iter().map(|e| e.id).max().unwrap_or(0) + 1,
            records: snapshot.expenses,
        };
        let incomes = RecordFile {
            next_id: snapshot.incomes.iter().map(|i| i.id).max().unwrap_or(0) + 1,
            records: snapshot.incomes,
        };

        let staged = [
            self.stage(&categories)?,
            self.stage(&expenses)?,
            self.stage(&incomes)?,
        ];
        for (tmp, name) in staged.into_iter().zip([CATEGORIES_FILE, EXPENSES_FILE, INCOMES_FILE]) {
            tmp.persist(self.dir.join(name))?;
        }

        self.categories = categories;
        self.expenses = expenses;
        self.incomes = incomes;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, filename: &str) -> CoreResult<Option<T>> {
        let path = self.dir.join(filename);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let data = serde_json::from_str(&content).map_err(|e| CoreError::IoError {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Ok(Some(data))
    }

    /// Serialize into a temp file next to the target without touching the target
    fn stage<T: Serialize>(&self, data: &T) -> CoreResult<NamedTempFile> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, data)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }

    fn write_json<T: Serialize>(&self, filename: &str, data: &T) -> CoreResult<()> {
        let tmp = self.stage(data)?;
        tmp.persist(self.dir.join(filename))?;
        Ok(())
    }
}

impl Store for JsonStore {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    fn categories(&self) -> CoreResult<Vec<String>> {
        Ok(self.categories.clone())
    }

    fn add_category(&mut self, name: &str) -> CoreResult<()> {
        let name = clean_category_name(name)?;
        if self.categories.contains(&name) {
            return Err(CoreError::conflict(format!("Category '{}' already exists", name)));
        }
        let mut categories = self.categories.clone();
        categories.push(name);
        self.write_json(CATEGORIES_FILE, &categories)?;
        self.categories = categories;
        Ok(())
    }

    fn rename_category(&mut self, old: &str, new: &str) -> CoreResult<()> {
        let new = clean_category_name(new)?;
        let pos = self
            .categories
            .iter()
            .position(|c| c == old)
            .ok_or_else(|| CoreError::not_found(format!("category '{}'", old)))?;
        if new == old {
            return Ok(());
        }
        if self.categories.contains(&new) {
            return Err(CoreError::conflict(format!("Category '{}' already exists", new)));
        }

        let mut categories = self.categories.clone();
        categories[pos] = new.clone();
        let mut expenses = self.expenses.clone();
        for expense in expenses.records.iter_mut().filter(|e| e.category == old) {
            expense.category = new.clone();
        }

        // Both files are fully written before either replaces its target.
        // Categories go first so a failure in between leaves both names
        // listed, never an expense pointing at a missing category.
        let staged_expenses = self.stage(&expenses)?;
        let staged_categories = self.stage(&categories)?;
        staged_categories.persist(self.dir.join(CATEGORIES_FILE))?;
        staged_expenses.persist(self.dir.join(EXPENSES_FILE))?;

        self.categories = categories;
        self.expenses = expenses;
        Ok(())
    }

    fn delete_category(&mut self, name: &str) -> CoreResult<()> {
        let pos = self
            .categories
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| CoreError::not_found(format!("category '{}'", name)))?;
        let used = self.expenses.records.iter().filter(|e| e.category == name).count();
        if let Some(reason) = blocking_reason(name, used, self.categories.len()) {
            return Err(CoreError::conflict(reason));
        }

        let mut categories = self.categories.clone();
        categories.remove(pos);
        self.write_json(CATEGORIES_FILE, &categories)?;
        self.categories = categories;
        Ok(())
    }

    fn add_expense(&mut self, draft: ExpenseDraft) -> CoreResult<i64> {
        draft.validate()?;

        let category = draft.category.trim().to_string();
        let new_category = !self.categories.contains(&category);

        let mut expenses = self.expenses.clone();
        let id = expenses.allocate_id();
        expenses.records.push(draft.into_expense(id));

        if new_category {
            let mut categories = self.categories.clone();
            categories.push(category);
            let staged_expenses = self.stage(&expenses)?;
            let staged_categories = self.stage(&categories)?;
            staged_categories.persist(self.dir.join(CATEGORIES_FILE))?;
            staged_expenses.persist(self.dir.join(EXPENSES_FILE))?;
            self.categories = categories;
        } else {
            self.write_json(EXPENSES_FILE, &expenses)?;
        }

        self.expenses = expenses;
        Ok(id)
    }

    fn add_income(&mut self, draft: IncomeDraft) -> CoreResult<i64> {
        draft.validate()?;

        let mut incomes = self.incomes.clone();
        let id = incomes.allocate_id();
        incomes.records.push(draft.into_income(id));
        self.write_json(INCOMES_FILE, &incomes)?;
        self.incomes = incomes;
        Ok(id)
    }

    fn query_expenses(&self, period: Option<&str>) -> CoreResult<Vec<Expense>> {
        Ok(self
            .expenses
            .records
            .iter()
            .filter(|e| matches_period(e.date, period))
            .cloned()
            .collect())
    }

    fn query_incomes(&self, period: Option<&str>) -> CoreResult<Vec<Income>> {
        Ok(self
            .incomes
            .records
            .iter()
            .filter(|i| matches_period(i.date, period))
            .cloned()
            .collect())
    }

    fn delete_expenses(&mut self, ids: &[i64]) -> CoreResult<usize> {
        let mut expenses = self.expenses.clone();
        expenses.records.retain(|e| !ids.contains(&e.id));
        let removed = self.expenses.records.len() - expenses.records.len();
        if removed > 0 {
            self.write_json(EXPENSES_FILE, &expenses)?;
            self.expenses = expenses;
        }
        Ok(removed)
    }

    fn delete_incomes(&mut self, ids: &[i64]) -> CoreResult<usize> {
        let mut incomes = self.incomes.clone();
        incomes.records.retain(|i| !ids.contains(&i.id));
        let removed = self.incomes.records.len() - incomes.records.len();
        if removed > 0 {
            self.write_json(INCOMES_FILE, &incomes)?;
            self.incomes = incomes;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn test_store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_default_files() {
        let (dir, store) = test_store();
        assert!(dir.path().join("categories.json").exists());
        assert!(dir.path().join("expenses.json").exists());
        assert!(dir.path().join("incomes.json").exists());
        assert_eq!(store.categories().unwrap().len(), DEFAULT_CATEGORIES.len());

        let raw = std::fs::read_to_string(dir.path().join("expenses.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["next_id"], 1);
        assert!(value["records"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_empty_category_file_is_reseeded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("categories.json"), "[]").unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert_eq!(store.categories().unwrap()[0], "Personal");
    }

    #[test]
    fn test_add_then_query_by_period() {
        let (_dir, mut store) = test_store();
        let id = store
            .add_expense(ExpenseDraft::new(Decimal::from(42), "Grocery", d(2024, 1, 10)))
            .unwrap();
        store
            .add_expense(ExpenseDraft::new(Decimal::from(5), "Grocery", d(2024, 2, 10)))
            .unwrap();

        let january = store.query_expenses(Some("2024-01")).unwrap();
        assert_eq!(january.len(), 1);
        assert_eq!(january[0].id, id);
        assert_eq!(store.query_expenses(Some("2024")).unwrap().len(), 2);
        assert_eq!(store.query_expenses(None).unwrap().len(), 2);
        assert!(store.query_expenses(Some("2023")).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_expense_not_persisted() {
        let (_dir, mut store) = test_store();
        let err = store
            .add_expense(ExpenseDraft::new(Decimal::from(-1), "Grocery", d(2024, 1, 10)))
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError { .. }));
        assert!(store.query_expenses(None).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_category_is_registered() {
        let (_dir, mut store) = test_store();
        store
            .add_expense(ExpenseDraft::new(Decimal::from(9), "Pets", d(2024, 3, 1)))
            .unwrap();
        assert_eq!(store.categories().unwrap().last().unwrap(), "Pets");
    }

    #[test]
    fn test_reopen_keeps_records_and_counter() {
        let dir = tempfile::tempdir().unwrap();
        let (first, second) = {
            let mut store = JsonStore::open(dir.path()).unwrap();
            let a = store
                .add_expense(ExpenseDraft::new(Decimal::new(1999, 2), "Home", d(2024, 4, 1)))
                .unwrap();
            let b = store
                .add_income(IncomeDraft::new(Decimal::from(3000), d(2024, 4, 1), Some("Salary".to_string())))
                .unwrap();
            store.delete_expenses(&[a]).unwrap();
            (a, b)
        };

        let mut store = JsonStore::open(dir.path()).unwrap();
        assert!(store.query_expenses(None).unwrap().is_empty());
        let incomes = store.query_incomes(None).unwrap();
        assert_eq!(incomes.len(), 1);
        assert_eq!(incomes[0].id, second);
        assert_eq!(incomes[0].source.as_deref(), Some("Salary"));

        let next = store
            .add_expense(ExpenseDraft::new(Decimal::from(1), "Home", d(2024, 4, 2)))
            .unwrap();
        assert!(next > first);
    }

    #[test]
    fn test_delete_ignores_absent_ids() {
        let (_dir, mut store) = test_store();
        let a = store.add_expense(ExpenseDraft::new(Decimal::from(1), "Home", d(2024, 1, 1))).unwrap();
        let b = store.add_expense(ExpenseDraft::new(Decimal::from(2), "Home", d(2024, 1, 2))).unwrap();

        assert_eq!(store.delete_expenses(&[a, 999]).unwrap(), 1);
        assert_eq!(store.delete_expenses(&[a]).unwrap(), 0);
        let rest = store.query_expenses(None).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, b);
    }

    #[test]
    fn test_rename_category_retags_expenses() {
        let (dir, mut store) = test_store();
        store.add_expense(ExpenseDraft::new(Decimal::from(1), "Grocery", d(2024, 1, 1))).unwrap();
        store.add_expense(ExpenseDraft::new(Decimal::from(2), "Home", d(2024, 1, 2))).unwrap();

        store.rename_category("Grocery", "Groceries").unwrap();

        let categories = store.categories().unwrap();
        assert!(!categories.contains(&"Grocery".to_string()));
        assert_eq!(categories[3], "Groceries");
        let expenses = store.query_expenses(None).unwrap();
        assert_eq!(expenses[0].category, "Groceries");
        assert_eq!(expenses[1].category, "Home");

        let reopened = JsonStore::open(dir.path()).unwrap();
        assert_eq!(reopened.query_expenses(None).unwrap()[0].category, "Groceries");
    }

    #[test]
    fn test_rename_to_existing_conflicts() {
        let (_dir, mut store) = test_store();
        let err = store.rename_category("Grocery", "Home").unwrap_err();
        assert!(matches!(err, CoreError::ConflictError { .. }));
        let err = store.rename_category("Nope", "Other").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        store.rename_category("Home", "Home").unwrap();
    }

    #[test]
    fn test_delete_referenced_category_conflicts() {
        let (_dir, mut store) = test_store();
        store.add_expense(ExpenseDraft::new(Decimal::from(1), "Travel", d(2024, 1, 1))).unwrap();
        let before = store.categories().unwrap();

        let err = store.delete_category("Travel").unwrap_err();
        assert!(matches!(err, CoreError::ConflictError { .. }));
        assert_eq!(store.categories().unwrap(), before);

        store.delete_category("Health").unwrap();
        assert!(!store.categories().unwrap().contains(&"Health".to_string()));
    }

    #[test]
    fn test_last_category_cannot_be_deleted() {
        let (_dir, mut store) = test_store();
        let names = store.categories().unwrap();
        for name in &names[1..] {
            store.delete_category(name).unwrap();
        }
        let err = store.delete_category(&names[0]).unwrap_err();
        assert!(matches!(err, CoreError::ConflictError { .. }));
    }

    #[test]
    fn test_add_category() {
        let (_dir, mut store) = test_store();
        store.add_category("Pets").unwrap();
        assert!(matches!(store.add_category("Pets"), Err(CoreError::ConflictError { .. })));
        assert!(matches!(store.add_category(" "), Err(CoreError::ValidationError { .. })));
    }

    #[test]
    fn test_import_snapshot_sets_counters() {
        let (_dir, mut store) = test_store();
        let snapshot = Snapshot {
            categories: vec!["Rent".to_string()],
            expenses: vec![ExpenseDraft::new(Decimal::from(800), "Rent", d(2024, 1, 1)).into_expense(17)],
            incomes: vec![],
        };
        store.import_snapshot(snapshot).unwrap();

        let id = store.add_expense(ExpenseDraft::new(Decimal::from(1), "Rent", d(2024, 2, 1))).unwrap();
        assert_eq!(id, 18);
        let income = store.add_income(IncomeDraft::new(Decimal::from(1), d(2024, 2, 1), None)).unwrap();
        assert_eq!(income, 1);
    }

    #[test]
    fn test_import_snapshot_rejects_out_of_range_amount() {
        let (_dir, mut store) = test_store();
        let mut huge = ExpenseDraft::new(Decimal::from(1), "Rent", d(2024, 1, 1)).into_expense(4);
        huge.amount = Decimal::MAX;
        let snapshot = Snapshot {
            categories: vec!["Rent".to_string()],
            expenses: vec![huge],
            incomes: vec![],
        };
        let err = store.import_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError { .. }));
        assert_eq!(store.categories().unwrap().len(), DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("expenses.json"), "{not json").unwrap();
        assert!(matches!(JsonStore::open(dir.path()), Err(CoreError::IoError { .. })));
    }

    #[test]
    fn test_amounts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let amounts = [
            Decimal::new(1, 1),
            Decimal::new(1, 4),
            Decimal::new(12_345_678, 4),
            Decimal::new(9_999_999_999_999, 4),
        ];
        {
            let mut store = JsonStore::open(dir.path()).unwrap();
            for amount in amounts {
                store.add_expense(ExpenseDraft::new(amount, "Home", d(2024, 1, 1))).unwrap();
            }
            store.add_income(IncomeDraft::new(Decimal::new(3_333_3333, 4), d(2024, 1, 1), None)).unwrap();
        }
        let store = JsonStore::open(dir.path()).unwrap();
        let stored: Vec<Decimal> = store.query_expenses(None).unwrap().iter().map(|e| e.amount).collect();
        assert_eq!(stored, amounts);
        assert_eq!(store.query_incomes(None).unwrap()[0].amount, Decimal::new(3_333_3333, 4));
    }

    #[test]
    fn test_out_of_range_amount_keeps_store_readable() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = JsonStore::open(dir.path()).unwrap();
            let err = store.add_expense(ExpenseDraft::new(Decimal::MAX, "Home", d(2024, 1, 1))).unwrap_err();
            assert!(matches!(err, CoreError::ValidationError { .. }));
            let precise = Decimal::new(1_234_567_890_123_456_789, 19);
            assert!(store.add_income(IncomeDraft::new(precise, d(2024, 1, 1), None)).is_err());
        }
        let store = JsonStore::open(dir.path()).unwrap();
        assert!(store.query_expenses(None).unwrap().is_empty());
        assert!(store.query_incomes(None).unwrap().is_empty());
    }

    #[test]
    fn test_failed_write_is_io_error_and_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(dir.path()).unwrap();
        store.add_expense(ExpenseDraft::new(Decimal::from(7), "Grocery", d(2024, 1, 1))).unwrap();
        let expenses_before = store.query_expenses(None).unwrap();
        let categories_before = store.categories().unwrap();

        std::fs::remove_dir_all(dir.path()).unwrap();

        let err = store.add_expense(ExpenseDraft::new(Decimal::from(3), "Grocery", d(2024, 1, 2))).unwrap_err();
        assert!(matches!(err, CoreError::IoError { .. }));
        let err = store.rename_category("Grocery", "Groceries").unwrap_err();
        assert!(matches!(err, CoreError::IoError { .. }));
        assert!(matches!(store.add_category("Pets"), Err(CoreError::IoError { .. })));
        assert!(matches!(store.delete_expenses(&[1]), Err(CoreError::IoError { .. })));

        assert_eq!(store.query_expenses(None).unwrap(), expenses_before);
        assert_eq!(store.categories().unwrap(), categories_before);
    }

    #[test]
    fn test_orphan_category_is_registered_on_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("categories.json"), r#"["Home"]"#).unwrap();
        std::fs::write(
            dir.path().join("expenses.json"),
            r#"{"next_id": 2, "records": [{"id": 1, "amount": 4.5, "category": "Groceries", "date": "2024-01-01"}]}"#,
        )
        .unwrap();

        let store = JsonStore::open(dir.path()).unwrap();
        assert_eq!(store.categories().unwrap(), vec!["Home".to_string(), "Groceries".to_string()]);

        let raw = std::fs::read_to_string(dir.path().join("categories.json")).unwrap();
        let saved: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved, vec!["Home", "Groceries"]);
    }
}

//! Data store contract shared by the JSON and SQLite backends

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::models::{Expense, ExpenseDraft, Income, IncomeDraft};

/// Categories seeded into a fresh store
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Personal",
    "Home",
    "Health",
    "Grocery",
    "Food & Dining",
    "Entertainment",
    "Transportation",
    "Travel",
    "Miscellaneous",
];

/// Persistent storage for categories, expenses and incomes.
///
/// Every mutating call persists the full updated state before it returns.
/// A failed call leaves both the stored and the in-memory state untouched.
pub trait Store: Send + Sync {
    /// Short backend name for logs and the settings page
    fn backend_name(&self) -> &'static str;

    /// Category names in display order
    fn categories(&self) -> CoreResult<Vec<String>>;

    fn add_category(&mut self, name: &str) -> CoreResult<()>;

    /// Rename a category and retag every expense that uses it
    fn rename_category(&mut self, old: &str, new: &str) -> CoreResult<()>;

    /// Refused while any expense references the category or when it is the last one
    fn delete_category(&mut self, name: &str) -> CoreResult<()>;

    /// Persist an expense and return its id. Unknown categories are registered.
    fn add_expense(&mut self, draft: ExpenseDraft) -> CoreResult<i64>;

    fn add_income(&mut self, draft: IncomeDraft) -> CoreResult<i64>;

    /// Expenses whose date starts with `period` (`2024`, `2024-01`), in insertion order
    fn query_expenses(&self, period: Option<&str>) -> CoreResult<Vec<Expense>>;

    fn query_incomes(&self, period: Option<&str>) -> CoreResult<Vec<Income>>;

    /// Remove the given ids; unknown ids are ignored. Returns the number removed.
    fn delete_expenses(&mut self, ids: &[i64]) -> CoreResult<usize>;

    fn delete_incomes(&mut self, ids: &[i64]) -> CoreResult<usize>;

    /// Everything in the store
    fn snapshot(&self) -> CoreResult<Snapshot> {
        Ok(Snapshot {
            categories: self.categories()?,
            expenses: self.query_expenses(None)?,
            incomes: self.query_incomes(None)?,
        })
    }
}

/// Full contents of a store, used for migration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub categories: Vec<String>,
    pub expenses: Vec<Expense>,
    pub incomes: Vec<Income>,
}

/// Trimmed, non-empty category name
pub(crate) fn clean_category_name(name: &str) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("Category name cannot be empty"));
    }
    Ok(name.to_string())
}

/// Reason a category cannot be deleted, if any
pub(crate) fn blocking_reason(name: &str, expense_count: usize, category_count: usize) -> Option<String> {
    if expense_count > 0 {
        let noun = if expense_count == 1 { "expense" } else { "expenses" };
        return Some(format!(
            "Cannot delete '{}': it is used by {} {}",
            name, expense_count, noun
        ));
    }
    if category_count <= 1 {
        return Some(format!("Cannot delete '{}': at least one category must exist", name));
    }
    None
}

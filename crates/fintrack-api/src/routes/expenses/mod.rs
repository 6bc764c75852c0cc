//! Expense routes - Entry forms, recurring expenses, monthly list
//!
//! Structure:
//! - api.rs: JSON API and HTMX form handlers
//! - page.rs: Full page and list fragment rendering

pub mod api;
pub mod page;

pub use api::{
    api_expense_create,
    api_expenses,
    api_expenses_delete,
    api_recurring_create,
    htmx_expense_store,
    htmx_expenses_delete,
    htmx_recurring_store,
};

pub use page::{htmx_expenses_list, page_expenses};

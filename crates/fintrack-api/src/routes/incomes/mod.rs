//! Income routes - Entry form and monthly list

pub mod api;
pub mod page;

pub use api::{api_income_create, api_incomes, api_incomes_delete, htmx_income_store, htmx_incomes_delete};
pub use page::{htmx_incomes_list, page_incomes};

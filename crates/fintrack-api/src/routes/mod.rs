//! Route modules for the API server
//!
//! Each module follows a consistent structure:
//! - mod.rs: Module declaration and exports
//! - api.rs: JSON API endpoints and HTMX form handlers
//! - page.rs: HTMX page rendering

pub mod analysis;
pub mod categories;
pub mod expenses;
pub mod incomes;
pub mod reports;
pub mod settings;

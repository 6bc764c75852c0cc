//! Report routes - Dashboard, yearly report, CSV export
//!
//! Structure:
//! - api.rs: JSON report, year list and CSV download
//! - page.rs: Dashboard page

pub mod api;
pub mod page;

pub use api::{api_export, api_report, api_years};
pub use page::page_dashboard;

//! Category routes - Add, rename, delete
//!
//! Structure:
//! - api.rs: JSON API and HTMX form handlers
//! - page.rs: Category page and list fragment

pub mod api;
pub mod page;

pub use api::{
    api_categories,
    api_category_create,
    api_category_delete,
    api_category_rename,
    htmx_category_create,
    htmx_category_delete,
    htmx_category_rename,
};

pub use page::{htmx_categories_list, page_categories};

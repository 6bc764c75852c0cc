//! Analysis routes - Direct query box and agent tool endpoints

pub mod api;
pub mod page;

pub use api::{api_agent_call, api_agent_tool, api_query, htmx_analysis_ask};
pub use page::page_analysis;

//! Structured queries over expense and income records
//!
//! Requests arrive either as JSON (`QueryRequest`) or as a direct-query
//! string parsed by [`QueryParser`]. Only whitelisted tables and columns
//! can be named; execution lives in `fintrack-core`.

pub mod error;
pub mod parser;
pub mod types;

pub use error::QueryParseError;
pub use parser::{QueryParser, GRAMMAR};
pub use types::{AggFunc, Aggregate, Filter, Op, QueryRequest, Sort, Table};

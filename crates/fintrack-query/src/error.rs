//! Error types for fintrack-query

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryParseError {
    #[error("empty query")]
    EmptyQuery,

    #[error("unknown table '{table}', expected 'expenses' or 'incomes'")]
    UnknownTable { table: String },

    #[error("unknown field '{field}' for table '{table}'")]
    UnknownField { table: String, field: String },

    #[error("unknown operator '{op}'")]
    UnknownOperator { op: String },

    #[error("malformed stage '{stage}': {message}")]
    MalformedStage { stage: String, message: String },

    #[error("{func} cannot be applied to field '{field}'")]
    InvalidAggregate { func: String, field: String },

    #[error("cannot sort by '{key}', available columns: {available}")]
    InvalidSortKey { key: String, available: String },

    #[error("invalid JSON request: {message}")]
    InvalidJson { message: String },
}

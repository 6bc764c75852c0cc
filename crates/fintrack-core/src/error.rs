//! Error types for fintrack-core
//!
//! Every failure carries an error code and a severity and can be turned
//! into an [`ErrorDetails`] payload with suggestions for API responses.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input rejected before it reached storage
    ValidationError,
    /// Operation would break a uniqueness or reference rule
    Conflict,
    /// Named category or record does not exist
    NotFound,
    /// Persistence failure
    IoError,
    /// Malformed or disallowed query
    QueryError,
    /// Configuration error
    ConfigError,
    /// Internal error
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::Conflict => write!(f, "CONFLICT"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::IoError => write!(f, "IO_ERROR"),
            ErrorCode::QueryError => write!(f, "QUERY_ERROR"),
            ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for fintrack-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Conflict: {message}")]
    ConflictError { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Query error: {message}")]
    QueryError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::ValidationError { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::ConflictError { message: message.into() }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound { what: what.into() }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::ValidationError { .. } => ErrorCode::ValidationError,
            CoreError::ConflictError { .. } => ErrorCode::Conflict,
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::IoError { .. } => ErrorCode::IoError,
            CoreError::QueryError { .. } => ErrorCode::QueryError,
            CoreError::ConfigError { .. } => ErrorCode::ConfigError,
            CoreError::InternalError { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::ValidationError { .. } => ErrorSeverity::Warning,
            CoreError::ConflictError { .. } => ErrorSeverity::Warning,
            CoreError::NotFound { .. } => ErrorSeverity::Info,
            CoreError::IoError { .. } => ErrorSeverity::Error,
            CoreError::QueryError { .. } => ErrorSeverity::Info,
            CoreError::ConfigError { .. } => ErrorSeverity::Critical,
            CoreError::InternalError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::ValidationError { message } => {
                details = details.with_detail(serde_json::json!({ "validation_message": message }));
                details = details.with_suggestion(
                    "Amounts must be positive numbers and a category must be selected.".to_string(),
                );
            }
            CoreError::ConflictError { .. } => {
                details = details.with_suggestion(
                    "Reassign or delete the expenses using this category first.".to_string(),
                );
            }
            CoreError::NotFound { .. } => {
                details = details.with_suggestion(
                    "Use the /api/categories endpoint to list all categories.".to_string(),
                );
            }
            CoreError::IoError { .. } => {
                details = details.with_suggestion(
                    "Check that the data directory exists and is writable.".to_string(),
                );
            }
            CoreError::QueryError { message } => {
                details = details.with_detail(serde_json::json!({ "query_message": message }));
                details = details.with_suggestion(format!(
                    "Query syntax: {}",
                    fintrack_query::GRAMMAR.replace('\n', " ")
                ));
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<io::Error> for CoreError {
    fn from(error: io::Error) -> Self {
        CoreError::IoError { message: error.to_string() }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::IoError { message: format!("invalid JSON data: {}", error) }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(error: rusqlite::Error) -> Self {
        CoreError::IoError { message: format!("database error: {}", error) }
    }
}

impl From<csv::Error> for CoreError {
    fn from(error: csv::Error) -> Self {
        CoreError::IoError { message: format!("CSV error: {}", error) }
    }
}

impl From<tempfile::PersistError> for CoreError {
    fn from(error: tempfile::PersistError) -> Self {
        CoreError::from(error.error)
    }
}

impl From<fintrack_config::ConfigError> for CoreError {
    fn from(error: fintrack_config::ConfigError) -> Self {
        CoreError::ConfigError { message: error.to_string() }
    }
}

impl From<fintrack_query::QueryParseError> for CoreError {
    fn from(error: fintrack_query::QueryParseError) -> Self {
        CoreError::QueryError { message: error.to_string() }
    }
}

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Request ID for tracing
    pub request_id: Option<String>,
    /// Operation being performed
    pub operation: String,
    /// Additional context data
    pub data: serde_json::Value,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: None,
            operation: operation.into(),
            data: serde_json::json!({}),
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data[key] = value;
        self
    }
}

/// Error logger trait
pub trait ErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
    fn log_warning(&self, message: &str, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        match error.severity() {
            ErrorSeverity::Info | ErrorSeverity::Warning => log::warn!(
                target: "fintrack::error",
                "{} [{}] {} - Operation: {} - Request: {:?}",
                error.severity(),
                error.code(),
                error,
                context.operation,
                context.request_id
            ),
            ErrorSeverity::Error | ErrorSeverity::Critical => log::error!(
                target: "fintrack::error",
                "{} [{}] {} - Operation: {} - Request: {:?} - Data: {}",
                error.severity(),
                error.code(),
                error.to_details(),
                context.operation,
                context.request_id,
                context.data
            ),
        }
    }

    fn log_warning(&self, message: &str, context: &ErrorContext) {
        log::warn!(
            target: "fintrack::error",
            "WARNING: {} - Operation: {} - Request: {:?}",
            message,
            context.operation,
            context.request_id
        );
    }
}

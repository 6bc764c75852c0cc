//! Error types for fintrack-api
//!
//! JSON endpoints answer with an [`ErrorDetails`] body; HTMX form posts
//! render the same message as an inline alert.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use fintrack_core::error::{DefaultErrorLogger, ErrorLogger};
use fintrack_core::{CoreError, ErrorCode, ErrorContext, ErrorDetails};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest { message: message.into() }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        ApiError::NotFound { resource: resource.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => match e.code() {
                ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::Conflict => StatusCode::CONFLICT,
                ErrorCode::NotFound => StatusCode::NOT_FOUND,
                ErrorCode::QueryError => StatusCode::BAD_REQUEST,
                ErrorCode::IoError | ErrorCode::ConfigError | ErrorCode::InternalError => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn to_details(&self) -> ErrorDetails {
        match self {
            ApiError::Core(e) => e.to_details(),
            ApiError::NotFound { .. } => ErrorDetails::new(ErrorCode::NotFound, self.to_string()),
            ApiError::BadRequest { .. } => ErrorDetails::new(ErrorCode::ValidationError, self.to_string()),
        }
    }

    /// Message shown to the user in a page alert
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Core(CoreError::ValidationError { message }) => message.clone(),
            ApiError::Core(CoreError::ConflictError { message }) => message.clone(),
            ApiError::BadRequest { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Log through the core error logger, tagged with the failing operation
    pub fn log(&self, operation: &str) {
        let context = ErrorContext::new(operation);
        match self {
            ApiError::Core(e) => DefaultErrorLogger.log_error(e, &context),
            other => DefaultErrorLogger.log_warning(&other.to_string(), &context),
        }
    }

    /// HTMX fragment with the status code kept, swapped in by the page script
    pub fn into_alert(self) -> Response {
        (self.status(), Html(crate::alert_error(&self.user_message()))).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::BadRequest { message: format!("invalid JSON body: {}", error) }
    }
}

impl From<fintrack_query::QueryParseError> for ApiError {
    fn from(error: fintrack_query::QueryParseError) -> Self {
        ApiError::Core(CoreError::from(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_details())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

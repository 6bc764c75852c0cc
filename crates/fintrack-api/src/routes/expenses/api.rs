//! Expense API endpoints - JSON API and HTMX form handlers
//!
//! Endpoints:
//! - api_expenses: Expenses for an optional period (JSON)
//! - api_expense_create: Store one expense (JSON)
//! - api_expenses_delete: Delete by id list (JSON)
//! - api_recurring_create: Expand and store a recurring expense (JSON)
//! - htmx_expense_store: Single expense form post
//! - htmx_recurring_store: Recurring expense form post
//! - htmx_expenses_delete: Batch delete form post

use crate::form::{form_outcome, FormData};
use crate::{ApiError, ApiResult, AppState};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::NaiveDate;
use fintrack_core::{Expense, ExpenseDraft, RecurringOutcome, RecurringRequest};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// JSON body for a single expense
#[derive(Debug, Deserialize)]
pub struct ExpenseInput {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<ExpenseInput> for ExpenseDraft {
    fn from(input: ExpenseInput) -> Self {
        ExpenseDraft::new(input.amount, input.category, input.date).with_notes(input.notes)
    }
}

/// JSON body for batch deletes
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub ids: Vec<i64>,
}

/// `?period=` with blank treated as absent
pub(crate) fn period_param(params: &HashMap<String, String>) -> Option<&str> {
    params
        .get("period")
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
}

pub async fn api_expenses(
    state: axum::extract::State<AppState>,
    params: Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Expense>>> {
    let ledger = state.ledger.read().await;
    Ok(Json(ledger.expenses(period_param(&params))?))
}

pub async fn api_expense_create(
    state: axum::extract::State<AppState>,
    body: String,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let input: ExpenseInput = serde_json::from_str(&body)?;
    let mut ledger = state.ledger.write().await;
    let id = ledger.add_expense(input.into()).map_err(|e| {
        let e = ApiError::from(e);
        e.log("api_expense_create");
        e
    })?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

pub async fn api_expenses_delete(
    state: axum::extract::State<AppState>,
    body: String,
) -> ApiResult<Json<serde_json::Value>> {
    let request: DeleteRequest = serde_json::from_str(&body)?;
    let mut ledger = state.ledger.write().await;
    let deleted = ledger.delete_expenses(&request.ids)?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

pub async fn api_recurring_create(
    state: axum::extract::State<AppState>,
    body: String,
) -> ApiResult<(StatusCode, Json<RecurringOutcome>)> {
    let request: RecurringRequest = serde_json::from_str(&body)?;
    let mut ledger = state.ledger.write().await;
    let outcome = ledger.add_recurring_expense(request).map_err(|e| {
        let e = ApiError::from(e);
        e.log("api_recurring_create");
        e
    })?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn htmx_expense_store(state: axum::extract::State<AppState>, body: String) -> Response {
    let form = FormData::parse(&body);
    let result = async {
        let draft = form.expense_draft()?;
        let mut ledger = state.ledger.write().await;
        let id = ledger.add_expense(draft)?;
        Ok::<_, ApiError>(format!("Expense #{} saved.", id))
    }
    .await;
    form_outcome("htmx_expense_store", result)
}

pub async fn htmx_recurring_store(state: axum::extract::State<AppState>, body: String) -> Response {
    let form = FormData::parse(&body);
    let result = async {
        let request = form.recurring_request()?;
        let frequency = request.frequency;
        let mut ledger = state.ledger.write().await;
        let outcome = ledger.add_recurring_expense(request)?;
        Ok::<_, ApiError>(if outcome.ids.is_empty() {
            "No occurrences fall between the start and end dates.".to_string()
        } else {
            format!("Created {} {} expenses.", outcome.ids.len(), frequency.to_string().to_lowercase())
        })
    }
    .await;
    form_outcome("htmx_recurring_store", result)
}

pub async fn htmx_expenses_delete(state: axum::extract::State<AppState>, body: String) -> Response {
    let form = FormData::parse(&body);
    let result = async {
        let ids = form.ids("ids")?;
        if ids.is_empty() {
            return Err(ApiError::bad_request("Select at least one expense to delete."));
        }
        let mut ledger = state.ledger.write().await;
        let deleted = ledger.delete_expenses(&ids)?;
        Ok::<_, ApiError>(format!("Deleted {} expense(s).", deleted))
    }
    .await;
    form_outcome("htmx_expenses_delete", result)
}

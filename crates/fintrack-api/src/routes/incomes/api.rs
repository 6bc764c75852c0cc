//! Income API endpoints - JSON API and HTMX form handlers

use crate::routes::expenses::api::{period_param, DeleteRequest};
use crate::form::{form_outcome, FormData};
use crate::{ApiError, ApiResult, AppState};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::NaiveDate;
use fintrack_core::{Income, IncomeDraft};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// JSON body for a single income
#[derive(Debug, Deserialize)]
pub struct IncomeInput {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub source: Option<String>,
}

pub async fn api_incomes(
    state: axum::extract::State<AppState>,
    params: Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Income>>> {
    let ledger = state.ledger.read().await;
    Ok(Json(ledger.incomes(period_param(&params))?))
}

pub async fn api_income_create(
    state: axum::extract::State<AppState>,
    body: String,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let input: IncomeInput = serde_json::from_str(&body)?;
    let mut ledger = state.ledger.write().await;
    let id = ledger
        .add_income(IncomeDraft::new(input.amount, input.date, input.source))
        .map_err(|e| {
            let e = ApiError::from(e);
            e.log("api_income_create");
            e
        })?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

pub async fn api_incomes_delete(
    state: axum::extract::State<AppState>,
    body: String,
) -> ApiResult<Json<serde_json::Value>> {
    let request: DeleteRequest = serde_json::from_str(&body)?;
    let mut ledger = state.ledger.write().await;
    let deleted = ledger.delete_incomes(&request.ids)?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

pub async fn htmx_income_store(state: axum::extract::State<AppState>, body: String) -> Response {
    let form = FormData::parse(&body);
    let result = async {
        let draft = form.income_draft()?;
        let mut ledger = state.ledger.write().await;
        let id = ledger.add_income(draft)?;
        Ok::<_, ApiError>(format!("Income #{} saved.", id))
    }
    .await;
    form_outcome("htmx_income_store", result)
}

pub async fn htmx_incomes_delete(state: axum::extract::State<AppState>, body: String) -> Response {
    let form = FormData::parse(&body);
    let result = async {
        let ids = form.ids("ids")?;
        if ids.is_empty() {
            return Err(ApiError::bad_request("Select at least one income to delete."));
        }
        let mut ledger = state.ledger.write().await;
        let deleted = ledger.delete_incomes(&ids)?;
        Ok::<_, ApiError>(format!("Deleted {} income record(s).", deleted))
    }
    .await;
    form_outcome("htmx_incomes_delete", result)
}

//! Category API endpoints - JSON API and HTMX form handlers
//!
//! Endpoints:
//! - api_categories: Category list (JSON)
//! - api_category_create: Add a category (JSON)
//! - api_category_rename: Rename and retag its expenses (JSON)
//! - api_category_delete: Delete an unused category (JSON)
//! - htmx_category_create / htmx_category_rename / htmx_category_delete: form posts

use crate::form::{form_outcome, FormData};
use crate::{ApiError, ApiResult, AppState};
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

/// JSON body carrying a category name
#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

pub async fn api_categories(state: axum::extract::State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let ledger = state.ledger.read().await;
    Ok(Json(ledger.categories()?))
}

pub async fn api_category_create(
    state: axum::extract::State<AppState>,
    body: String,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let input: CategoryInput = serde_json::from_str(&body)?;
    let mut ledger = state.ledger.write().await;
    ledger.add_category(&input.name)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "name": input.name.trim() }))))
}

pub async fn api_category_rename(
    state: axum::extract::State<AppState>,
    Path(name): Path<String>,
    body: String,
) -> ApiResult<Json<serde_json::Value>> {
    let input: CategoryInput = serde_json::from_str(&body)?;
    let mut ledger = state.ledger.write().await;
    ledger.rename_category(&name, &input.name).map_err(|e| {
        let e = ApiError::from(e);
        e.log("api_category_rename");
        e
    })?;
    Ok(Json(serde_json::json!({ "old": name, "new": input.name.trim() })))
}

pub async fn api_category_delete(
    state: axum::extract::State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut ledger = state.ledger.write().await;
    ledger.delete_category(&name)?;
    Ok(Json(serde_json::json!({ "deleted": name })))
}

pub async fn htmx_category_create(state: axum::extract::State<AppState>, body: String) -> Response {
    let form = FormData::parse(&body);
    let result = async {
        let name = form.required("name", "Category name")?;
        state.ledger.write().await.add_category(&name)?;
        Ok::<_, ApiError>(format!("Category '{}' added.", name))
    }
    .await;
    form_outcome("htmx_category_create", result)
}

pub async fn htmx_category_rename(state: axum::extract::State<AppState>, body: String) -> Response {
    let form = FormData::parse(&body);
    let result = async {
        let old = form.required("old", "Current name")?;
        let new = form.required("new", "New name")?;
        state.ledger.write().await.rename_category(&old, &new)?;
        Ok::<_, ApiError>(format!("Renamed '{}' to '{}'.", old, new))
    }
    .await;
    form_outcome("htmx_category_rename", result)
}

pub async fn htmx_category_delete(state: axum::extract::State<AppState>, body: String) -> Response {
    let form = FormData::parse(&body);
    let result = async {
        let name = form.required("name", "Category name")?;
        state.ledger.write().await.delete_category(&name)?;
        Ok::<_, ApiError>(format!("Category '{}' deleted.", name))
    }
    .await;
    form_outcome("htmx_category_delete", result)
}

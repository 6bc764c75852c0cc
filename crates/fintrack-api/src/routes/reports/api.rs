//! Report API endpoints - JSON and CSV
//!
//! Endpoints:
//! - api_report: Full yearly report (JSON)
//! - api_years: Years with data and the default year (JSON)
//! - api_export: One year as a CSV download

use crate::{ApiError, ApiResult, AppState};
use axum::extract::Path;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use fintrack_core::export::export_file_name;
use fintrack_core::YearReport;

pub async fn api_report(
    state: axum::extract::State<AppState>,
    Path(year): Path<i32>,
) -> ApiResult<Json<YearReport>> {
    let ledger = state.ledger.read().await;
    let report = ledger.year_report(year).map_err(|e| {
        let e = ApiError::from(e);
        e.log("year_report");
        e
    })?;
    Ok(Json(report))
}

pub async fn api_years(state: axum::extract::State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let ledger = state.ledger.read().await;
    let years = ledger.available_years()?;
    let default_year = ledger.default_year()?;
    Ok(Json(serde_json::json!({
        "years": years,
        "default_year": default_year,
    })))
}

pub async fn api_export(
    state: axum::extract::State<AppState>,
    Path(year): Path<i32>,
) -> ApiResult<Response> {
    let ledger = state.ledger.read().await;
    let csv = ledger.export_year_csv(year).map_err(|e| {
        let e = ApiError::from(e);
        e.log("export_year_csv");
        e
    })?;
    log::info!("Exported {} bytes of CSV for {}", csv.len(), year);

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export_file_name(year)),
        ),
    ];
    Ok((headers, Bytes::from(csv)).into_response())
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_app;
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use fintrack_core::ExpenseDraft;
    use rust_decimal::Decimal;

    async fn seed(app: &crate::test_support::TestApp) {
        let mut ledger = app.ledger.write().await;
        for (amount, category, date) in [(100, "Grocery", "2024-01-05"), (50, "Grocery", "2024-02-10"), (800, "Rent", "2024-01-01")] {
            let date: NaiveDate = date.parse().unwrap();
            ledger.add_expense(ExpenseDraft::new(Decimal::from(amount), category, date)).unwrap();
        }
    }

    #[tokio::test]
    async fn test_report_json() {
        let app = test_app();
        seed(&app).await;
        let (status, body) = app.get("/api/reports/2024").await;
        assert_eq!(status, StatusCode::OK);
        let report: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(report["total_expenses"], 950.0);
        assert_eq!(report["categories"][0]["category"], "Rent");
        assert_eq!(report["categories"][0]["share"], 84.21);
        assert_eq!(report["categories"][1]["share"], 15.79);
    }

    #[tokio::test]
    async fn test_years() {
        let app = test_app();
        seed(&app).await;
        let (_, body) = app.get("/api/years").await;
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["years"], serde_json::json!([2024]));
        assert_eq!(value["default_year"], 2024);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let app = test_app();
        seed(&app).await;
        let request = axum::http::Request::builder()
            .uri("/api/export/2024")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = tower::ServiceExt::oneshot(app.router.clone(), request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"fintrack-2024.csv\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Type,Category,Amount,Date,Notes\n"));
        assert!(text.contains("Expense,Rent,800,2024-01-01,"));
        assert!(text.ends_with("Type,Source,Amount,Date\n"));
    }

    #[tokio::test]
    async fn test_bad_year_rejected() {
        let app = test_app();
        let (status, _) = app.get("/api/reports/twenty").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

//! HTTP API server with HTMX support
//!
//! Routes are organized into modules:
//! - routes::reports: Dashboard, yearly report, years, CSV export
//! - routes::expenses: Expense entry, recurring expenses, monthly list
//! - routes::incomes: Income entry and monthly list
//! - routes::categories: Category management
//! - routes::analysis: Direct query box and the agent tool endpoints
//! - routes::settings: Configuration display

pub mod agent;
pub mod context;
pub mod error;
pub mod form;
pub mod routes;

use axum::{
    http::HeaderMap,
    routing::{get, post, put},
    Router,
};
use fintrack_config::Config;
use fintrack_core::Ledger;
use fintrack_utils::escape_html;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

pub use agent::{AgentTool, ExpenseQueryTool};
pub use context::PageContext;
pub use error::{ApiError, ApiResult};

/// Event fired through `HX-Trigger` after a successful mutation; list
/// fragments listen for it and reload themselves.
pub const RECORDS_CHANGED: &str = "records-changed";

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub config: Config,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::analysis::{api_agent_call, api_agent_tool, api_query, htmx_analysis_ask, page_analysis};
    use routes::categories::{
        api_categories, api_category_create, api_category_delete, api_category_rename, htmx_categories_list,
        htmx_category_create, htmx_category_delete, htmx_category_rename, page_categories,
    };
    use routes::expenses::{
        api_expense_create, api_expenses, api_expenses_delete, api_recurring_create, htmx_expense_store,
        htmx_expenses_delete, htmx_expenses_list, htmx_recurring_store, page_expenses,
    };
    use routes::incomes::{
        api_income_create, api_incomes, api_incomes_delete, htmx_income_store, htmx_incomes_delete,
        htmx_incomes_list, page_incomes,
    };
    use routes::reports::{api_export, api_report, api_years, page_dashboard};
    use routes::settings::{api_settings, page_settings};

    let cors_enable = state.config.server.cors_enable;

    let router = Router::new()
        // API endpoints
        .route("/api/health", get(health_check))
        .route(
            "/api/expenses",
            get(api_expenses).post(api_expense_create).delete(api_expenses_delete),
        )
        .route("/api/expenses/recurring", post(api_recurring_create))
        .route(
            "/api/incomes",
            get(api_incomes).post(api_income_create).delete(api_incomes_delete),
        )
        .route("/api/categories", get(api_categories).post(api_category_create))
        .route("/api/categories/:name", put(api_category_rename).delete(api_category_delete))
        .route("/api/reports/:year", get(api_report))
        .route("/api/years", get(api_years))
        .route("/api/export/:year", get(api_export))
        .route("/api/query", post(api_query))
        .route("/api/agent/tool", get(api_agent_tool))
        .route("/api/agent/call", post(api_agent_call))
        .route("/api/settings", get(api_settings))
        // HTMX page routes
        .route("/", get(page_dashboard))
        .route("/expenses", get(page_expenses).post(htmx_expense_store))
        .route("/incomes", get(page_incomes).post(htmx_income_store))
        .route("/categories", get(page_categories).post(htmx_category_create))
        .route("/analysis", get(page_analysis))
        .route("/settings", get(page_settings))
        // HTMX partial routes
        .route("/expenses/list", get(htmx_expenses_list))
        .route("/expenses/recurring", post(htmx_recurring_store))
        .route("/expenses/delete", post(htmx_expenses_delete))
        .route("/incomes/list", get(htmx_incomes_list))
        .route("/incomes/delete", post(htmx_incomes_delete))
        .route("/categories/list", get(htmx_categories_list))
        .route("/categories/rename", post(htmx_category_rename))
        .route("/categories/delete", post(htmx_category_delete))
        .route("/analysis/ask", post(htmx_analysis_ask))
        .with_state(state);

    if cors_enable {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

// ==================== Template Functions ====================

/// Base HTML template
pub fn base_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Fintrack</title>
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
    <script src="https://cdn.tailwindcss.com"></script>
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js"></script>
    <style>
        .htmx-indicator {{ opacity: 0; transition: opacity 0.3s; }}
        .htmx-request .htmx-indicator {{ opacity: 1; }}
        .htmx-request.htmx-indicator {{ opacity: 1; }}
    </style>
</head>
<body class="bg-gray-50 text-gray-900">
    {}
    <script>
    // Error responses carry an alert fragment; swap it in like a success.
    document.body.addEventListener('htmx:beforeSwap', function(evt) {{
        if (evt.detail.xhr.status >= 400) {{
            evt.detail.shouldSwap = true;
            evt.detail.isError = false;
        }}
    }});
    </script>
</body>
</html>"#,
        escape_html(title),
        content
    )
}

/// Navigation sidebar
pub fn nav_sidebar(current_path: &str) -> String {
    let links = [
        ("/", "Dashboard", "dashboard"),
        ("/expenses", "Expenses", "expenses"),
        ("/incomes", "Income", "incomes"),
        ("/categories", "Categories", "categories"),
        ("/analysis", "Analysis", "analysis"),
        ("/settings", "Settings", "settings"),
    ];

    let mut nav = String::from("<div class='bg-white border-r h-screen flex flex-col'><div class='p-4 border-b'><h1 class='text-xl font-bold text-indigo-600'>Fintrack</h1></div><ul class='flex-1 py-2 space-y-1 px-2'>");

    for (path, label, id) in &links {
        let is_active = if *path == "/" {
            current_path == "/"
        } else {
            current_path.starts_with(path)
        };
        let active_class = if is_active { "bg-indigo-50 text-indigo-600" } else { "text-gray-600 hover:bg-gray-50" };
        let icon = match *id {
            "dashboard" => "📊",
            "expenses" => "💸",
            "incomes" => "💰",
            "categories" => "🏷️",
            "analysis" => "🔎",
            "settings" => "⚙️",
            _ => "📄",
        };
        nav.push_str(&format!(
            r#"<li><a href='{}' class='flex items-center gap-2 px-3 py-2 rounded-lg {}'>{}<span>{}</span></a></li>"#,
            path, active_class, icon, label
        ));
    }
    nav.push_str("</ul></div>");
    nav
}

/// Check if request is from HTMX (partial page update)
fn is_htmx_request(headers: &HeaderMap) -> bool {
    headers.get("hx-request").is_some()
}

/// Wrap content for full page or HTMX partial
pub fn page_response(headers: &HeaderMap, title: &str, current_path: &str, inner_content: &str) -> String {
    if is_htmx_request(headers) {
        format!(r#"<main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>"#, inner_content)
    } else {
        base_html(title, &format!(r#"<div class='flex flex-col h-screen'>
    <div class='flex flex-1 overflow-hidden'>
        <aside class='w-64 flex-shrink-0'>{}</aside>
        <main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>
    </div>
</div>"#,
            nav_sidebar(current_path), inner_content))
    }
}

/// Green inline alert
pub fn alert_success(message: &str) -> String {
    format!(
        "<div class='p-3 mb-3 rounded-lg border border-green-200 bg-green-50 text-green-700 text-sm'>{}</div>",
        escape_html(message)
    )
}

/// Red inline alert
pub fn alert_error(message: &str) -> String {
    format!(
        "<div class='p-3 mb-3 rounded-lg border border-red-200 bg-red-50 text-red-700 text-sm'>{}</div>",
        escape_html(message)
    )
}

/// Card shown in place of page content when loading data failed
pub fn error_panel(error: &ApiError) -> String {
    format!(
        "<div class='bg-white rounded-xl shadow-sm p-6'>{}</div>",
        alert_error(&error.user_message())
    )
}

/// Start the HTTP server
///
/// Binds to the configured address and serves until the listener fails.
pub async fn start_server(config: Config, ledger: Arc<RwLock<Ledger>>) -> std::io::Result<()> {
    let addr = config.bind_address();
    let state = AppState { ledger, config };

    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    log::info!("Starting Fintrack server on http://{}", addr);
    log::info!("Available routes:");
    log::info!("  - / (Dashboard)");
    log::info!("  - /expenses, /incomes (Record entry)");
    log::info!("  - /categories (Category management)");
    log::info!("  - /analysis (Direct query)");
    log::info!("  - /settings (Configuration)");
    log::info!("  - /api/* (JSON API endpoints)");

    axum::serve(listener, router).await?;
    log::info!("Server stopped gracefully");
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use tower::ServiceExt;

    pub struct TestApp {
        pub router: Router,
        pub ledger: Arc<RwLock<Ledger>>,
        _dir: tempfile::TempDir,
    }

    pub fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data.path = dir.path().to_path_buf();
        let ledger = Arc::new(RwLock::new(Ledger::open(config.clone()).unwrap()));
        let router = create_router(AppState { ledger: ledger.clone(), config });
        TestApp { router, ledger, _dir: dir }
    }

    impl TestApp {
        pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
            let response: Response<Body> = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, String::from_utf8(bytes.to_vec()).unwrap())
        }

        pub async fn get(&self, uri: &str) -> (StatusCode, String) {
            self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
        }

        pub async fn json(&self, method: &str, uri: &str, body: serde_json::Value) -> (StatusCode, String) {
            self.send(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }

        pub async fn form(&self, uri: &str, body: &str) -> (StatusCode, String) {
            self.send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/x-www-form-urlencoded")
                    .header("hx-request", "true")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_app;
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = app.get("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_full_page_has_nav_and_partial_does_not() {
        let app = test_app();
        let (status, body) = app.get("/settings").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<!DOCTYPE html>"));
        assert!(body.contains("Fintrack</h1>"));

        let request = axum::http::Request::builder()
            .uri("/settings")
            .header("hx-request", "true")
            .body(axum::body::Body::empty())
            .unwrap();
        let (_, partial) = app.send(request).await;
        assert!(!partial.contains("<!DOCTYPE html>"));
        assert!(partial.starts_with("<main"));
    }

    #[tokio::test]
    async fn test_unknown_route_404() {
        let app = test_app();
        let (status, _) = app.get("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_alerts_escape() {
        assert!(alert_error("<b>").contains("&lt;b&gt;"));
        assert!(alert_success("ok").contains("green"));
    }

    #[test]
    fn test_nav_marks_active() {
        let nav = nav_sidebar("/expenses");
        assert!(nav.contains("href='/expenses' class='flex items-center gap-2 px-3 py-2 rounded-lg bg-indigo-50"));
        assert!(nav.contains("href='/' class='flex items-center gap-2 px-3 py-2 rounded-lg text-gray-600"));
    }
}

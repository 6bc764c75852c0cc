//! Settings page rendering - Effective configuration

use crate::AppState;
use fintrack_utils::escape_html;

fn setting(label: &str, value: &str) -> String {
    format!(
        "<div><p class='text-sm text-gray-500'>{}</p><p class='font-medium'>{}</p></div>",
        label,
        escape_html(value)
    )
}

fn enabled(flag: bool) -> &'static str {
    if flag { "Enabled" } else { "Disabled" }
}

pub async fn page_settings(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
) -> axum::response::Html<String> {
    let config = &state.config;
    let backend = state.ledger.read().await.backend_name();

    let storage_file = match config.data.backend {
        fintrack_config::Backend::Sqlite => config.database_path().display().to_string(),
        fintrack_config::Backend::Json => "categories.json, expenses.json, incomes.json".to_string(),
    };

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Settings</h2></div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>Server</h3>
            <div class='grid grid-cols-2 gap-4 mb-4'>{}{}{}</div>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>Data</h3>
            <div class='grid grid-cols-2 gap-4 mb-4'>{}{}{}{}</div>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>Display</h3>
            <div class='grid grid-cols-2 gap-4 mb-4'>{}{}{}{}</div>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6'>
            <h3 class='text-lg font-semibold mb-4'>Agent</h3>
            <div class='grid grid-cols-2 gap-4'>{}{}</div>
        </div>"#,
        setting("Host", &config.server.host),
        setting("Port", &config.server.port.to_string()),
        setting("CORS", enabled(config.server.cors_enable)),
        setting("Backend", backend),
        setting("Data directory", &config.data.path.display().to_string()),
        setting("Storage", &storage_file),
        setting("Export directory", &config.export.path.display().to_string()),
        setting("Currency symbol", &config.currency.symbol),
        setting("Decimal places", &config.currency.decimal_places.to_string()),
        setting(
            "Default year",
            &config
                .dashboard
                .default_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "Latest year with data".to_string()),
        ),
        setting("Top categories", &config.dashboard.top_categories.to_string()),
        setting("Query tool", enabled(config.agent.enabled)),
        setting("Max rows", &config.agent.max_rows.to_string()),
    );

    axum::response::Html(crate::page_response(&headers, "Settings", "/settings", &inner_content))
}

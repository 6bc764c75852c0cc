//! Settings API endpoints - JSON API

use crate::AppState;
use axum::Json;
use fintrack_config::Config;

pub async fn api_settings(state: axum::extract::State<AppState>) -> Json<Config> {
    Json(state.config.clone())
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_app;

    #[tokio::test]
    async fn test_settings_json() {
        let app = test_app();
        let (_, body) = app.get("/api/settings").await;
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["server"]["port"], 8501);
        assert_eq!(value["data"]["backend"], "json");
        assert_eq!(value["agent"]["max_rows"], 200);
    }
}

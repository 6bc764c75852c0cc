//! Query and agent endpoints
//!
//! Endpoints:
//! - api_query: Run a query, JSON table out; malformed queries are 400
//! - api_agent_tool: Tool descriptor for an agent framework
//! - api_agent_call: Run the tool; always answers with text
//! - htmx_analysis_ask: Query box form post, text answer fragment

use crate::agent::{AgentTool, ExpenseQueryTool};
use crate::form::FormData;
use crate::{ApiError, ApiResult, AppState};
use axum::Json;
use fintrack_core::{QueryResult, ToolDescriptor};
use fintrack_query::{QueryParser, QueryRequest};
use fintrack_utils::escape_html;
use serde_json::Value;

/// `{"query": "..."}` is parsed as text; anything else as a structured request
fn parse_request(body: &str) -> ApiResult<QueryRequest> {
    let value: Value = serde_json::from_str(body)?;
    let request = match value.get("query") {
        Some(Value::String(text)) => QueryParser::parse(text)?,
        Some(_) => return Err(ApiError::bad_request("'query' must be a string")),
        None => QueryRequest::from_json(value)?,
    };
    Ok(request)
}

pub async fn api_query(state: axum::extract::State<AppState>, body: String) -> ApiResult<Json<QueryResult>> {
    let request = parse_request(&body).map_err(|e| {
        e.log("api_query");
        e
    })?;
    let ledger = state.ledger.read().await;
    Ok(Json(ledger.run_query(&request)?))
}

fn ensure_agent_enabled(state: &AppState) -> ApiResult<()> {
    if state.config.agent.enabled {
        Ok(())
    } else {
        Err(ApiError::not_found("agent tool (disabled in configuration)"))
    }
}

pub async fn api_agent_tool(state: axum::extract::State<AppState>) -> ApiResult<Json<ToolDescriptor>> {
    ensure_agent_enabled(&state)?;
    let tool = ExpenseQueryTool::new(state.ledger.clone());
    Ok(Json(tool.descriptor().await))
}

/// Body is `{"name": "query_expenses", "input": {...}}` or the input itself
pub async fn api_agent_call(state: axum::extract::State<AppState>, body: String) -> ApiResult<Json<Value>> {
    ensure_agent_enabled(&state)?;
    let mut value: Value = serde_json::from_str(&body)?;
    let tool = ExpenseQueryTool::new(state.ledger.clone());

    if let Some(name) = value.get("name").and_then(Value::as_str) {
        if name != tool.name() {
            return Err(ApiError::not_found(format!("tool '{}'", name)));
        }
    }
    let input = match value.get_mut("input") {
        Some(input) => input.take(),
        None => value,
    };

    let content = tool.call(input).await;
    log::debug!("Agent tool answered with {} bytes", content.len());
    Ok(Json(serde_json::json!({
        "tool": tool.name(),
        "content": content,
    })))
}

pub async fn htmx_analysis_ask(state: axum::extract::State<AppState>, body: String) -> axum::response::Html<String> {
    let form = FormData::parse(&body);
    let answer = match form.text("query") {
        Some(text) => state.ledger.read().await.answer_query(&text),
        None => "Type a query first.".to_string(),
    };
    axum::response::Html(format!(
        "<pre class='p-4 bg-gray-900 text-gray-100 rounded-lg text-sm overflow-auto'>{}</pre>",
        escape_html(&answer)
    ))
}

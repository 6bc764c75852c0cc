//! Query tool exposed to an external language-model agent
//!
//! The agent sees a descriptor (name, description, JSON input schema) and
//! calls the tool with JSON input. Every call answers with text, including
//! malformed queries, so the agent can retry on its own.

use async_trait::async_trait;
use fintrack_core::{CoreError, Ledger, ToolDescriptor};
use fintrack_query::QueryRequest;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &str;

    async fn descriptor(&self) -> ToolDescriptor;

    async fn call(&self, input: Value) -> String;
}

/// Read-only structured query over expenses and incomes
pub struct ExpenseQueryTool {
    ledger: Arc<RwLock<Ledger>>,
}

impl ExpenseQueryTool {
    pub const NAME: &'static str = "query_expenses";

    pub fn new(ledger: Arc<RwLock<Ledger>>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl AgentTool for ExpenseQueryTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn descriptor(&self) -> ToolDescriptor {
        self.ledger.read().await.tool_descriptor()
    }

    /// `{"query": "from expenses | ..."}` or a structured request object
    async fn call(&self, input: Value) -> String {
        let ledger = self.ledger.read().await;
        match input.get("query") {
            Some(Value::String(text)) => ledger.answer_query(text),
            Some(_) => fintrack_core::query::render_answer(Err(CoreError::QueryError {
                message: "'query' must be a string".to_string(),
            })),
            None => {
                let result = QueryRequest::from_json(input)
                    .map_err(CoreError::from)
                    .and_then(|request| ledger.run_query(&request));
                fintrack_core::query::render_answer(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fintrack_config::Config;
    use fintrack_core::ExpenseDraft;
    use rust_decimal::Decimal;

    fn tool_with_rent(dir: &std::path::Path) -> ExpenseQueryTool {
        let mut config = Config::default();
        config.data.path = dir.to_path_buf();
        let mut ledger = Ledger::open(config).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ledger.add_expense(ExpenseDraft::new(Decimal::from(800), "Rent", date)).unwrap();
        ExpenseQueryTool::new(Arc::new(RwLock::new(ledger)))
    }

    #[tokio::test]
    async fn test_text_query() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool_with_rent(dir.path());
        let answer = tool
            .call(serde_json::json!({"query": "from expenses | where category = Rent | sum amount"}))
            .await;
        assert!(answer.contains("800"));
    }

    #[tokio::test]
    async fn test_structured_query() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool_with_rent(dir.path());
        let answer = tool
            .call(serde_json::json!({
                "table": "expenses",
                "filters": [{"field": "category", "op": "=", "value": "Rent"}]
            }))
            .await;
        assert!(answer.contains("Rent"));
    }

    #[tokio::test]
    async fn test_bad_input_is_text() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool_with_rent(dir.path());
        assert!(tool.call(serde_json::json!({"query": 5})).await.starts_with("Query error:"));
        assert!(tool.call(serde_json::json!({"table": "users"})).await.starts_with("Query error:"));
        assert_eq!(tool.name(), "query_expenses");
        assert_eq!(tool.descriptor().await.name, "query_expenses");
    }
}

//! Analysis page rendering

use crate::{page_response, AppState};
use fintrack_core::query::data_schema;
use fintrack_query::{Table, GRAMMAR};
use fintrack_utils::escape_html;

const EXAMPLES: &[&str] = &[
    "from expenses | where date ^= 2024 | group by category | sum amount | sort by sum_amount desc",
    "from expenses | where category = Grocery | avg amount",
    "from incomes | group by source | sum amount",
    "from expenses | sort by amount desc | limit 10",
];

pub async fn page_analysis(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
) -> axum::response::Html<String> {
    let examples: String = EXAMPLES
        .iter()
        .map(|q| format!("<li><code class='text-xs'>{}</code></li>", escape_html(q)))
        .collect();

    let agent_note = if state.config.agent.enabled {
        format!(
            "Agents can call this query through <code>/api/agent/call</code> (at most {} rows).",
            state.config.agent.max_rows
        )
    } else {
        "The agent endpoints are disabled in the configuration.".to_string()
    };

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Analysis</h2></div>
        <div class='grid grid-cols-1 lg:grid-cols-3 gap-6'>
            <div class='lg:col-span-2 bg-white rounded-xl shadow-sm p-6'>
                <form hx-post='/analysis/ask' hx-target='#answer' class='space-y-3'>
                    <textarea name='query' rows='3' placeholder='from expenses | group by category | sum amount' class='w-full px-3 py-2 border rounded-lg font-mono text-sm'></textarea>
                    <button class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Run</button>
                </form>
                <div id='answer' class='mt-4'></div>
            </div>
            <div class='bg-white rounded-xl shadow-sm p-6 text-sm space-y-4'>
                <div><h3 class='font-semibold mb-2'>Syntax</h3><pre class='text-xs whitespace-pre-wrap'>{}</pre></div>
                <div><h3 class='font-semibold mb-2'>Tables</h3><pre class='text-xs whitespace-pre-wrap'>{}

{}</pre></div>
                <div><h3 class='font-semibold mb-2'>Examples</h3><ul class='space-y-1'>{}</ul></div>
                <p class='text-gray-500'>{}</p>
            </div>
        </div>"#,
        escape_html(GRAMMAR),
        escape_html(&data_schema(Table::Expenses)),
        escape_html(&data_schema(Table::Incomes)),
        examples,
        agent_note
    );

    axum::response::Html(page_response(&headers, "Analysis", "/analysis", &inner_content))
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_app;

    #[tokio::test]
    async fn test_analysis_page() {
        let app = test_app();
        let (_, body) = app.get("/analysis").await;
        assert!(body.contains("hx-post='/analysis/ask'"));
        assert!(body.contains("Table expenses:"));
        assert!(body.contains("/api/agent/call"));
    }
}

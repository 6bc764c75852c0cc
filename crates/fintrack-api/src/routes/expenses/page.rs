//! Expense page rendering
//!
//! Endpoints:
//! - page_expenses: Entry forms and the list for one period
//! - htmx_expenses_list: List fragment, reloaded after every change
//!
//! Helper functions:
//! - render_expense_table: Checkbox table posting to the batch delete

use super::api::period_param;
use crate::context::current_month;
use crate::{page_response, ApiError, AppState, PageContext, RECORDS_CHANGED};
use axum::extract::Query;
use fintrack_core::{Expense, Frequency};
use fintrack_utils::escape_html;
use rust_decimal::Decimal;
use std::collections::HashMap;

pub async fn page_expenses(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    params: Query<HashMap<String, String>>,
) -> axum::response::Html<String> {
    let period = period_param(&params).map(str::to_string).unwrap_or_else(current_month);
    let ledger = state.ledger.read().await;
    let year = period.get(..4).and_then(|y| y.parse().ok());

    let inner_content = match PageContext::build(&ledger, year) {
        Ok(ctx) => render_page(&ctx, &period),
        Err(e) => {
            let e = ApiError::from(e);
            e.log("page_expenses");
            crate::error_panel(&e)
        }
    };

    axum::response::Html(page_response(&headers, "Expenses", "/expenses", &inner_content))
}

fn frequency_options() -> String {
    Frequency::ALL
        .iter()
        .map(|f| format!("<option value='{0}' {1}>{0}</option>", f, if *f == Frequency::Monthly { "selected" } else { "" }))
        .collect()
}

fn render_page(ctx: &PageContext, period: &str) -> String {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    let period = escape_html(period);
    let month_value = if period.len() == 7 { period.clone() } else { String::new() };
    format!(
        r#"<div class='flex items-center justify-between mb-6'>
            <h2 class='text-2xl font-bold'>Expenses</h2>
            <form method='get' action='/expenses' class='flex items-center gap-2'>
                <label class='text-sm text-gray-600'>Month</label>
                <input type='month' name='period' value='{month}' onchange='this.form.submit()' class='px-2 py-1.5 text-sm border rounded-lg'>
                <a href='/expenses?period={year}' class='px-3 py-1.5 text-sm border rounded-lg hover:bg-gray-50'>Whole {year}</a>
            </form>
        </div>
        <div id='expense-alert'></div>
        <div class='grid grid-cols-1 lg:grid-cols-2 gap-6 mb-6'>
            <form hx-post='/expenses' hx-target='#expense-alert' class='bg-white rounded-xl shadow-sm p-6 space-y-3'>
                <h3 class='text-lg font-semibold'>Add expense</h3>
                <input name='amount' placeholder='Amount' inputmode='decimal' class='w-full px-3 py-2 border rounded-lg'>
                <select name='category' class='w-full px-3 py-2 border rounded-lg bg-white'>{categories}</select>
                <input type='date' name='date' value='{today}' class='w-full px-3 py-2 border rounded-lg'>
                <input name='notes' placeholder='Notes (optional)' class='w-full px-3 py-2 border rounded-lg'>
                <button class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Save</button>
            </form>
            <form hx-post='/expenses/recurring' hx-target='#expense-alert' class='bg-white rounded-xl shadow-sm p-6 space-y-3'>
                <h3 class='text-lg font-semibold'>Add recurring expense</h3>
                <input name='amount' placeholder='Amount' inputmode='decimal' class='w-full px-3 py-2 border rounded-lg'>
                <select name='category' class='w-full px-3 py-2 border rounded-lg bg-white'>{categories}</select>
                <div class='flex gap-2'>
                    <input type='date' name='start_date' value='{today}' class='flex-1 px-3 py-2 border rounded-lg'>
                    <input type='date' name='end_date' class='flex-1 px-3 py-2 border rounded-lg'>
                </div>
                <select name='frequency' class='w-full px-3 py-2 border rounded-lg bg-white'>{frequencies}</select>
                <input name='notes' placeholder='Notes (optional)' class='w-full px-3 py-2 border rounded-lg'>
                <button class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Create series</button>
            </form>
        </div>
        <div id='expense-list' hx-get='/expenses/list?period={period}' hx-trigger='load, {event} from:body' class='bg-white rounded-xl shadow-sm p-6'>
            <p class='text-gray-500 text-center'>Loading...</p>
        </div>"#,
        month = month_value,
        year = ctx.selected_year,
        categories = ctx.category_options(),
        today = today,
        frequencies = frequency_options(),
        period = period,
        event = RECORDS_CHANGED,
    )
}

pub async fn htmx_expenses_list(
    state: axum::extract::State<AppState>,
    params: Query<HashMap<String, String>>,
) -> axum::response::Html<String> {
    let ledger = state.ledger.read().await;
    let period = period_param(&params);
    let html = ledger
        .expenses(period)
        .map_err(ApiError::from)
        .and_then(|expenses| {
            let ctx = PageContext::build(&ledger, None)?;
            Ok(render_expense_table(&ctx, &expenses, period.unwrap_or("all time")))
        })
        .unwrap_or_else(|e| {
            e.log("htmx_expenses_list");
            crate::alert_error(&e.user_message())
        });
    axum::response::Html(html)
}

pub fn render_expense_table(ctx: &PageContext, expenses: &[Expense], period: &str) -> String {
    if expenses.is_empty() {
        return format!("<p class='text-gray-500 text-center'>No expenses for {}.</p>", escape_html(period));
    }

    let total: Decimal = expenses.iter().map(|e| e.amount).sum();
    let rows: String = expenses
        .iter()
        .map(|e| {
            let badge = e
                .frequency
                .map(|f| format!("<span class='ml-2 px-2 py-0.5 text-xs rounded bg-indigo-50 text-indigo-600'>{}</span>", f))
                .unwrap_or_default();
            format!(
                r#"<tr class='border-b'>
                <td class='py-2'><input type='checkbox' name='ids' value='{}'></td>
                <td class='py-2'>{}</td>
                <td class='py-2'>{}{}</td>
                <td class='py-2 text-right'>{}</td>
                <td class='py-2 text-gray-500'>{}</td>
            </tr>"#,
                e.id,
                e.date.format("%Y-%m-%d"),
                escape_html(&e.category),
                badge,
                ctx.money(e.amount),
                escape_html(e.notes.as_deref().unwrap_or(""))
            )
        })
        .collect();

    format!(
        r#"<form hx-post='/expenses/delete' hx-target='#expense-alert' hx-confirm='Delete the selected expenses?'>
        <div class='flex items-center justify-between mb-3'>
            <h3 class='text-lg font-semibold'>{} expense(s) in {}, total {}</h3>
            <button class='px-3 py-1.5 text-sm border border-red-200 text-red-600 rounded-lg hover:bg-red-50'>Delete selected</button>
        </div>
        <table class='w-full text-sm'>
            <thead><tr class='text-left text-gray-500 border-b'><th></th><th class='py-2'>Date</th><th class='py-2'>Category</th><th class='py-2 text-right'>Amount</th><th class='py-2'>Notes</th></tr></thead>
            <tbody>{}</tbody>
        </table>
        </form>"#,
        expenses.len(),
        escape_html(period),
        ctx.money(total),
        rows
    )
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_app;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_page_has_both_forms() {
        let app = test_app();
        let (status, body) = app.get("/expenses?period=2024-02").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("hx-post='/expenses'"));
        assert!(body.contains("hx-post='/expenses/recurring'"));
        assert!(body.contains("/expenses/list?period=2024-02"));
        assert!(body.contains("<option value='Grocery'>Grocery</option>"));
        assert!(body.contains("<option value='Monthly' selected>Monthly</option>"));
    }

    #[tokio::test]
    async fn test_list_fragment() {
        let app = test_app();
        app.form("/expenses", "amount=1234.5&category=Home&date=2024-02-03&notes=%3Cdesk%3E").await;

        let (_, body) = app.get("/expenses/list?period=2024-02").await;
        assert!(body.contains("name='ids'"));
        assert!(body.contains("$1,234.50"));
        assert!(body.contains("&lt;desk&gt;"));

        let (_, empty) = app.get("/expenses/list?period=2024-03").await;
        assert!(empty.contains("No expenses for 2024-03."));
    }

    #[tokio::test]
    async fn test_list_bad_period_is_alert() {
        let app = test_app();
        let (status, body) = app.get("/expenses/list?period=24").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("is not a period"));
    }
}

//! Income page rendering

use crate::context::current_month;
use crate::routes::expenses::api::period_param;
use crate::{page_response, ApiError, AppState, PageContext, RECORDS_CHANGED};
use axum::extract::Query;
use fintrack_core::Income;
use fintrack_utils::escape_html;
use rust_decimal::Decimal;
use std::collections::HashMap;

pub async fn page_incomes(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    params: Query<HashMap<String, String>>,
) -> axum::response::Html<String> {
    let period = period_param(&params).map(str::to_string).unwrap_or_else(current_month);
    let ledger = state.ledger.read().await;
    let year = period.get(..4).and_then(|y| y.parse().ok());

    let inner_content = match PageContext::build(&ledger, year) {
        Ok(ctx) => {
            let today = chrono::Local::now().format("%Y-%m-%d").to_string();
            let period = escape_html(&period);
            let month_value = if period.len() == 7 { period.clone() } else { String::new() };
            format!(
                r#"<div class='flex items-center justify-between mb-6'>
            <h2 class='text-2xl font-bold'>Income</h2>
            <form method='get' action='/incomes' class='flex items-center gap-2'>
                <label class='text-sm text-gray-600'>Month</label>
                <input type='month' name='period' value='{month}' onchange='this.form.submit()' class='px-2 py-1.5 text-sm border rounded-lg'>
                <a href='/incomes?period={year}' class='px-3 py-1.5 text-sm border rounded-lg hover:bg-gray-50'>Whole {year}</a>
            </form>
        </div>
        <div id='income-alert'></div>
        <form hx-post='/incomes' hx-target='#income-alert' class='bg-white rounded-xl shadow-sm p-6 space-y-3 mb-6 max-w-xl'>
            <h3 class='text-lg font-semibold'>Add income</h3>
            <input name='amount' placeholder='Amount' inputmode='decimal' class='w-full px-3 py-2 border rounded-lg'>
            <input type='date' name='date' value='{today}' class='w-full px-3 py-2 border rounded-lg'>
            <input name='source' placeholder='Source (optional)' class='w-full px-3 py-2 border rounded-lg'>
            <button class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Save</button>
        </form>
        <div id='income-list' hx-get='/incomes/list?period={period}' hx-trigger='load, {event} from:body' class='bg-white rounded-xl shadow-sm p-6'>
            <p class='text-gray-500 text-center'>Loading...</p>
        </div>"#,
                month = month_value,
                year = ctx.selected_year,
                today = today,
                period = period,
                event = RECORDS_CHANGED,
            )
        }
        Err(e) => {
            let e = ApiError::from(e);
            e.log("page_incomes");
            crate::error_panel(&e)
        }
    };

    axum::response::Html(page_response(&headers, "Income", "/incomes", &inner_content))
}

pub async fn htmx_incomes_list(
    state: axum::extract::State<AppState>,
    params: Query<HashMap<String, String>>,
) -> axum::response::Html<String> {
    let ledger = state.ledger.read().await;
    let period = period_param(&params);
    let html = ledger
        .incomes(period)
        .map_err(ApiError::from)
        .and_then(|incomes| {
            let ctx = PageContext::build(&ledger, None)?;
            Ok(render_income_table(&ctx, &incomes, period.unwrap_or("all time")))
        })
        .unwrap_or_else(|e| {
            e.log("htmx_incomes_list");
            crate::alert_error(&e.user_message())
        });
    axum::response::Html(html)
}

fn render_income_table(ctx: &PageContext, incomes: &[Income], period: &str) -> String {
    if incomes.is_empty() {
        return format!("<p class='text-gray-500 text-center'>No income for {}.</p>", escape_html(period));
    }
    let total: Decimal = incomes.iter().map(|i| i.amount).sum();
    let rows: String = incomes
        .iter()
        .map(|i| {
            format!(
                "<tr class='border-b'><td class='py-2'><input type='checkbox' name='ids' value='{}'></td><td class='py-2'>{}</td><td class='py-2'>{}</td><td class='py-2 text-right'>{}</td></tr>",
                i.id,
                i.date.format("%Y-%m-%d"),
                escape_html(i.source.as_deref().unwrap_or("")),
                ctx.money(i.amount)
            )
        })
        .collect();
    format!(
        r#"<form hx-post='/incomes/delete' hx-target='#income-alert' hx-confirm='Delete the selected income records?'>
        <div class='flex items-center justify-between mb-3'>
            <h3 class='text-lg font-semibold'>{} record(s) in {}, total {}</h3>
            <button class='px-3 py-1.5 text-sm border border-red-200 text-red-600 rounded-lg hover:bg-red-50'>Delete selected</button>
        </div>
        <table class='w-full text-sm'>
            <thead><tr class='text-left text-gray-500 border-b'><th></th><th class='py-2'>Date</th><th class='py-2'>Source</th><th class='py-2 text-right'>Amount</th></tr></thead>
            <tbody>{}</tbody>
        </table>
        </form>"#,
        incomes.len(),
        escape_html(period),
        ctx.money(total),
        rows
    )
}

//! Dashboard page rendering
//!
//! Helper functions:
//! - render_category_table: Totals and shares, largest first
//! - render_monthly_table: Expenses and income side by side per month
//! - render_charts: Chart.js canvases fed with embedded JSON

use crate::{page_response, AppState, PageContext};
use axum::extract::Query;
use fintrack_core::reports::{CategoryAverage, CategoryTotal, MonthTotal};
use fintrack_core::YearReport;
use fintrack_utils::{escape_html, format_number};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

pub async fn page_dashboard(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    params: Query<HashMap<String, String>>,
) -> axum::response::Html<String> {
    let ledger = state.ledger.read().await;
    let loaded = PageContext::build(&ledger, PageContext::year_param(&params)).and_then(|ctx| {
        let report = ledger.year_report(ctx.selected_year)?;
        Ok((ctx, report))
    });

    let inner_content = match loaded {
        Ok((ctx, report)) => render_dashboard(&ctx, &report, state.config.dashboard.top_categories),
        Err(e) => {
            let e = crate::ApiError::from(e);
            e.log("page_dashboard");
            crate::error_panel(&e)
        }
    };

    axum::response::Html(page_response(&headers, "Dashboard", "/", &inner_content))
}

fn render_dashboard(ctx: &PageContext, report: &YearReport, top_categories: usize) -> String {
    let net_class = if report.net < Decimal::ZERO { "text-red-600" } else { "text-green-600" };

    if report.expense_count == 0 && report.income_count == 0 {
        return format!(
            r#"<div class='flex items-center justify-between mb-6'><h2 class='text-2xl font-bold'>Dashboard</h2>{}</div>
        <div class='bg-white rounded-xl shadow-sm p-6 text-gray-500'>No records for {}. Add expenses or income to see the summary.</div>"#,
            ctx.year_selector("/"),
            report.year
        );
    }

    format!(
        r#"<div class='flex items-center justify-between mb-6'>
            <h2 class='text-2xl font-bold'>Dashboard</h2>
            <div class='flex items-center gap-3'>
                {}
                <a href='/api/export/{}' class='px-3 py-1.5 text-sm border rounded-lg hover:bg-gray-50'>Export CSV</a>
            </div>
        </div>
        <div class='grid grid-cols-1 md:grid-cols-2 lg:grid-cols-4 gap-4 mb-6'>
            <div class='bg-yellow-50 p-4 rounded-lg border border-yellow-200'><p class='text-sm text-yellow-600'>Total expenses</p><p class='text-2xl font-bold text-yellow-700'>{}</p></div>
            <div class='bg-blue-50 p-4 rounded-lg border border-blue-200'><p class='text-sm text-blue-600'>Total income</p><p class='text-2xl font-bold text-blue-700'>{}</p></div>
            <div class='bg-white p-4 rounded-lg border'><p class='text-sm text-gray-600'>Net</p><p class='text-2xl font-bold {}'>{}</p></div>
            <div class='bg-white p-4 rounded-lg border'><p class='text-sm text-gray-600'>Records</p><p class='text-2xl font-bold'>{} / {}</p></div>
        </div>
        <div class='grid grid-cols-1 lg:grid-cols-2 gap-6 mb-6'>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Top categories</h3>
                {}
            </div>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Monthly</h3>
                {}
            </div>
        </div>
        <div class='grid grid-cols-1 lg:grid-cols-2 gap-6'>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Average per month</h3>
                {}
            </div>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Spending by category</h3>
                {}
            </div>
        </div>"#,
        ctx.year_selector("/"),
        report.year,
        ctx.money(report.total_expenses),
        ctx.money(report.total_income),
        net_class,
        ctx.money(report.net),
        format_number(report.expense_count),
        format_number(report.income_count),
        render_category_table(ctx, &report.categories, top_categories),
        render_monthly_table(ctx, &report.monthly_expenses, &report.monthly_income),
        render_averages(ctx, &report.category_averages),
        render_charts(report),
    )
}

fn render_category_table(ctx: &PageContext, categories: &[CategoryTotal], limit: usize) -> String {
    if categories.is_empty() {
        return "<p class='text-gray-500'>No expenses this year.</p>".to_string();
    }
    let rows: String = categories
        .iter()
        .take(limit)
        .map(|c| {
            format!(
                r#"<tr class='border-b'>
                <td class='py-2'>{}</td>
                <td class='py-2 text-right'>{}</td>
                <td class='py-2 w-40'><div class='flex items-center gap-2'><div class='h-2 bg-indigo-500 rounded' style='width: {}%'></div><span class='text-xs text-gray-500'>{}%</span></div></td>
            </tr>"#,
                escape_html(&c.category),
                ctx.money(c.total),
                c.share.round(),
                c.share
            )
        })
        .collect();
    format!(
        "<table class='w-full text-sm'><thead><tr class='text-left text-gray-500 border-b'><th class='py-2'>Category</th><th class='py-2 text-right'>Total</th><th class='py-2'>Share</th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

fn render_monthly_table(ctx: &PageContext, expenses: &[MonthTotal], incomes: &[MonthTotal]) -> String {
    let mut months: BTreeMap<&str, (Decimal, Decimal)> = BTreeMap::new();
    for m in expenses {
        months.entry(m.month.as_str()).or_default().0 += m.total;
    }
    for m in incomes {
        months.entry(m.month.as_str()).or_default().1 += m.total;
    }

    let rows: String = months
        .iter()
        .map(|(month, (spent, earned))| {
            let net = *earned - *spent;
            format!(
                "<tr class='border-b'><td class='py-2'>{}</td><td class='py-2 text-right'>{}</td><td class='py-2 text-right'>{}</td><td class='py-2 text-right {}'>{}</td></tr>",
                month,
                ctx.money(*spent),
                ctx.money(*earned),
                if net < Decimal::ZERO { "text-red-600" } else { "text-green-600" },
                ctx.money(net)
            )
        })
        .collect();
    format!(
        "<table class='w-full text-sm'><thead><tr class='text-left text-gray-500 border-b'><th class='py-2'>Month</th><th class='py-2 text-right'>Expenses</th><th class='py-2 text-right'>Income</th><th class='py-2 text-right'>Net</th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

fn render_averages(ctx: &PageContext, averages: &[CategoryAverage]) -> String {
    if averages.is_empty() {
        return "<p class='text-gray-500'>No expenses this year.</p>".to_string();
    }
    let rows: String = averages
        .iter()
        .map(|a| {
            format!(
                "<div class='flex justify-between py-2 border-b'><span>{}</span><span class='font-medium'>{}</span></div>",
                escape_html(&a.category),
                ctx.money(a.monthly_average)
            )
        })
        .collect();
    format!("<div class='text-sm'>{}</div>", rows)
}

/// JSON for an inline `<script>`; `</` is split so data cannot close the tag
fn script_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

fn render_charts(report: &YearReport) -> String {
    let shares: Vec<(&str, f64)> = report
        .categories
        .iter()
        .map(|c| (c.category.as_str(), c.share.to_f64().unwrap_or_default()))
        .collect();
    format!(
        r#"<canvas id='category-chart' height='220'></canvas>
        <canvas id='series-chart' height='220' class='mt-6'></canvas>
        <script>
        (function() {{
            if (typeof Chart === 'undefined') return;
            const shares = {};
            const series = {};
            new Chart(document.getElementById('category-chart'), {{
                type: 'doughnut',
                data: {{ labels: shares.map(s => s[0]), datasets: [{{ data: shares.map(s => s[1]) }}] }}
            }});
            new Chart(document.getElementById('series-chart'), {{
                type: 'line',
                data: {{
                    labels: series.months,
                    datasets: series.lines.map(l => ({{ label: l.category, data: l.values }}))
                }}
            }});
        }})();
        </script>"#,
        script_json(&shares),
        script_json(&report.category_series)
    )
}

//! Per-request view state
//!
//! Every page handler builds a fresh [`PageContext`] from the ledger. Nothing
//! about the user's selection outlives the request.

use chrono::Local;
use fintrack_config::CurrencyConfig;
use fintrack_core::{CoreResult, Ledger};
use fintrack_utils::{escape_html, format_money};
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PageContext {
    pub categories: Vec<String>,
    pub selected_year: i32,
    /// Years with data, most recent first; always contains `selected_year`
    pub available_years: Vec<i32>,
    pub currency: CurrencyConfig,
}

impl PageContext {
    pub fn build(ledger: &Ledger, requested_year: Option<i32>) -> CoreResult<Self> {
        let categories = ledger.categories()?;
        let mut available_years = ledger.available_years()?;
        let selected_year = match requested_year {
            Some(year) => year,
            None => ledger.default_year()?,
        };
        if !available_years.contains(&selected_year) {
            available_years.push(selected_year);
            available_years.sort_unstable_by(|a, b| b.cmp(a));
        }
        Ok(Self {
            categories,
            selected_year,
            available_years,
            currency: ledger.config().currency.clone(),
        })
    }

    /// `year` query parameter, ignored when it is not a number
    pub fn year_param(params: &HashMap<String, String>) -> Option<i32> {
        params.get("year").and_then(|y| y.trim().parse().ok())
    }

    pub fn money(&self, amount: Decimal) -> String {
        format_money(
            amount,
            &self.currency.symbol,
            self.currency.decimal_places,
            &self.currency.thousands_separator,
        )
    }

    pub fn year_selector(&self, action: &str) -> String {
        let options: String = self
            .available_years
            .iter()
            .map(|year| {
                format!(
                    "<option value='{0}' {1}>{0}</option>",
                    year,
                    if *year == self.selected_year { "selected" } else { "" }
                )
            })
            .collect();
        format!(
            r#"<form method='get' action='{}' class='flex items-center gap-2'>
            <label class='text-sm text-gray-600'>Year</label>
            <select name='year' onchange='this.form.submit()' class='px-2 py-1.5 text-sm border rounded-lg bg-white'>{}</select>
        </form>"#,
            action, options
        )
    }

    pub fn category_options(&self) -> String {
        let mut html = String::from("<option value=''>Select a category</option>");
        for name in &self.categories {
            let escaped = escape_html(name);
            html.push_str(&format!("<option value='{0}'>{0}</option>", escaped));
        }
        html
    }
}

/// Month shown when a list page is opened without `?period=`
pub fn current_month() -> String {
    Local::now().format("%Y-%m").to_string()
}

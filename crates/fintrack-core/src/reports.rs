//! Aggregations behind the dashboard and the JSON report API

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{Entry, Expense, Income};
use fintrack_utils::percentage;

/// Total spent in one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    /// Percentage of all expenses, rounded to two places
    #[serde(with = "rust_decimal::serde::float")]
    pub share: Decimal,
    pub count: usize,
}

/// Totals for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthTotal {
    /// `YYYY-MM`
    pub month: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub mean: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAverage {
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_average: Decimal,
}

/// One line of the per-category chart; `values` is aligned with `CategorySeries::months`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesLine {
    pub category: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySeries {
    pub months: Vec<String>,
    pub lines: Vec<SeriesLine>,
}

/// Everything the dashboard shows for one year
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearReport {
    pub year: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net: Decimal,
    pub expense_count: usize,
    pub income_count: usize,
    pub categories: Vec<CategoryTotal>,
    pub monthly_expenses: Vec<MonthTotal>,
    pub monthly_income: Vec<MonthTotal>,
    pub category_averages: Vec<CategoryAverage>,
    pub category_series: CategorySeries,
}

fn sum<T: Entry>(entries: &[T]) -> Decimal {
    entries.iter().map(|e| e.amount()).sum()
}

fn sorted_by_total(totals: HashMap<&str, (Decimal, usize)>) -> Vec<(String, Decimal, usize)> {
    let mut rows: Vec<(String, Decimal, usize)> = totals
        .into_iter()
        .map(|(name, (total, count))| (name.to_string(), total, count))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

fn per_category(expenses: &[Expense]) -> HashMap<&str, (Decimal, usize)> {
    let mut totals: HashMap<&str, (Decimal, usize)> = HashMap::new();
    for expense in expenses {
        let entry = totals.entry(expense.category.as_str()).or_insert((Decimal::ZERO, 0));
        entry.0 += expense.amount;
        entry.1 += 1;
    }
    totals
}

/// Per-category totals and shares, largest first, ties by name
pub fn category_totals(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let grand_total = sum(expenses);
    sorted_by_total(per_category(expenses))
        .into_iter()
        .map(|(category, total, count)| CategoryTotal {
            share: percentage(total, grand_total).round_dp(2),
            category,
            total,
            count,
        })
        .collect()
}

/// One row per month with at least one entry, in calendar order
pub fn monthly_totals<T: Entry>(entries: &[T]) -> Vec<MonthTotal> {
    let mut months: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
    for entry in entries {
        let row = months.entry(entry.month_key()).or_insert((Decimal::ZERO, 0));
        row.0 += entry.amount();
        row.1 += 1;
    }
    months
        .into_iter()
        .map(|(month, (total, count))| MonthTotal {
            month,
            total,
            count,
            mean: (total / Decimal::from(count)).round_dp(2),
        })
        .collect()
}

/// Category total divided by the number of distinct months present in the input
pub fn category_monthly_averages(expenses: &[Expense]) -> Vec<CategoryAverage> {
    let months: BTreeSet<String> = expenses.iter().map(|e| e.month_key()).collect();
    if months.is_empty() {
        return Vec::new();
    }
    let divisor = Decimal::from(months.len());
    sorted_by_total(per_category(expenses))
        .into_iter()
        .map(|(category, total, _)| CategoryAverage {
            category,
            monthly_average: (total / divisor).round_dp(2),
        })
        .collect()
}

/// Per-category per-month totals; months without spending are zero
pub fn category_series(expenses: &[Expense]) -> CategorySeries {
    let months: Vec<String> = expenses
        .iter()
        .map(|e| e.month_key())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: HashMap<&str, usize> = months.iter().enumerate().map(|(i, m)| (m.as_str(), i)).collect();

    let mut values: BTreeMap<&str, Vec<Decimal>> = BTreeMap::new();
    for expense in expenses {
        let line = values
            .entry(expense.category.as_str())
            .or_insert_with(|| vec![Decimal::ZERO; months.len()]);
        let month = expense.month_key();
        if let Some(&i) = index.get(month.as_str()) {
            line[i] += expense.amount;
        }
    }

    let lines = values
        .into_iter()
        .map(|(category, totals)| SeriesLine {
            category: category.to_string(),
            values: totals.into_iter().map(decimal_to_f64).collect(),
        })
        .collect();

    CategorySeries { months, lines }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or_default()
}

/// Build the report for `year` from records that may span several years
pub fn year_report(year: i32, expenses: &[Expense], incomes: &[Income]) -> YearReport {
    let expenses: Vec<Expense> = expenses.iter().filter(|e| e.year() == year).cloned().collect();
    let incomes: Vec<Income> = incomes.iter().filter(|i| i.year() == year).cloned().collect();

    let total_expenses = sum(&expenses);
    let total_income = sum(&incomes);

    YearReport {
        year,
        total_expenses,
        total_income,
        net: total_income - total_expenses,
        expense_count: expenses.len(),
        income_count: incomes.len(),
        categories: category_totals(&expenses),
        monthly_expenses: monthly_totals(&expenses),
        monthly_income: monthly_totals(&incomes),
        category_averages: category_monthly_averages(&expenses),
        category_series: category_series(&expenses),
    }
}

/// Years with at least one record, most recent first
pub fn available_years(expenses: &[Expense], incomes: &[Income]) -> Vec<i32> {
    let years: BTreeSet<i32> = expenses
        .iter()
        .map(|e| e.year())
        .chain(incomes.iter().map(|i| i.year()))
        .collect();
    years.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExpenseDraft;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn expense(id: i64, category: &str, amount: i64, date: &str) -> Expense {
        let date = NaiveDate::from_str(date).unwrap();
        ExpenseDraft::new(Decimal::from(amount), category, date).into_expense(id)
    }

    fn income(id: i64, amount: i64, date: &str) -> Income {
        Income {
            id,
            amount: Decimal::from(amount),
            date: NaiveDate::from_str(date).unwrap(),
            source: None,
        }
    }

    fn sample() -> Vec<Expense> {
        vec![
            expense(1, "Grocery", 100, "2024-01-05"),
            expense(2, "Grocery", 50, "2024-02-10"),
            expense(3, "Rent", 800, "2024-01-01"),
        ]
    }

    #[test]
    fn test_category_totals_and_shares() {
        let totals = category_totals(&sample());
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].category, "Rent");
        assert_eq!(totals[0].total, Decimal::from(800));
        assert_eq!(totals[0].share, Decimal::from_str("84.21").unwrap());
        assert_eq!(totals[1].category, "Grocery");
        assert_eq!(totals[1].total, Decimal::from(150));
        assert_eq!(totals[1].share, Decimal::from_str("15.79").unwrap());
        assert_eq!(totals[1].count, 2);
    }

    #[test]
    fn test_ties_sorted_by_name() {
        let expenses = vec![expense(1, "Travel", 10, "2024-01-01"), expense(2, "Health", 10, "2024-01-01")];
        let totals = category_totals(&expenses);
        assert_eq!(totals[0].category, "Health");
        assert_eq!(totals[1].category, "Travel");
    }

    #[test]
    fn test_monthly_totals_in_calendar_order() {
        let mut expenses = sample();
        expenses.push(expense(4, "Home", 30, "2024-11-20"));
        let months = monthly_totals(&expenses);
        let keys: Vec<&str> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(keys, vec!["2024-01", "2024-02", "2024-11"]);
        assert_eq!(months[0].total, Decimal::from(900));
        assert_eq!(months[0].count, 2);
        assert_eq!(months[0].mean, Decimal::from(450));
    }

    #[test]
    fn test_monthly_average_divides_by_observed_months() {
        let averages = category_monthly_averages(&sample());
        let rent = averages.iter().find(|a| a.category == "Rent").unwrap();
        let grocery = averages.iter().find(|a| a.category == "Grocery").unwrap();
        assert_eq!(rent.monthly_average, Decimal::from(400));
        assert_eq!(grocery.monthly_average, Decimal::from(75));
    }

    #[test]
    fn test_category_series_zero_fills() {
        let series = category_series(&sample());
        assert_eq!(series.months, vec!["2024-01", "2024-02"]);
        let rent = series.lines.iter().find(|l| l.category == "Rent").unwrap();
        assert_eq!(rent.values, vec![800.0, 0.0]);
    }

    #[test]
    fn test_year_report_filters_year() {
        let mut expenses = sample();
        expenses.push(expense(9, "Travel", 999, "2023-12-31"));
        let incomes = vec![income(1, 3000, "2024-01-31"), income(2, 10, "2023-06-01")];

        let report = year_report(2024, &expenses, &incomes);
        assert_eq!(report.expense_count, 3);
        assert_eq!(report.total_expenses, Decimal::from(950));
        assert_eq!(report.total_income, Decimal::from(3000));
        assert_eq!(report.net, Decimal::from(2050));
        assert_eq!(report.monthly_income.len(), 1);
        assert!(report.categories.iter().all(|c| c.category != "Travel"));
    }

    #[test]
    fn test_largest_amounts_sum_exactly() {
        let largest = crate::models::MAX_AMOUNT - Decimal::new(1, 4);
        let expenses: Vec<Expense> = (1..=10_000)
            .map(|id| {
                let mut e = expense(id, "Home", 1, "2024-03-01");
                e.amount = largest;
                e
            })
            .collect();

        let report = year_report(2024, &expenses, &[]);
        assert_eq!(report.total_expenses, largest * Decimal::from(10_000));
        assert_eq!(report.categories[0].share, Decimal::from(100));
        assert_eq!(report.monthly_expenses[0].total, report.total_expenses);
        assert_eq!(report.category_averages[0].monthly_average, report.total_expenses);
    }

    #[test]
    fn test_empty_inputs() {
        let report = year_report(2024, &[], &[]);
        assert_eq!(report.total_expenses, Decimal::ZERO);
        assert!(report.categories.is_empty());
        assert!(report.category_averages.is_empty());
        assert!(report.category_series.months.is_empty());
    }

    #[test]
    fn test_available_years_desc() {
        let expenses = vec![expense(1, "Home", 1, "2022-01-01"), expense(2, "Home", 1, "2024-01-01")];
        let incomes = vec![income(1, 1, "2023-05-05"), income(2, 1, "2024-05-05")];
        assert_eq!(available_years(&expenses, &incomes), vec![2024, 2023, 2022]);
    }
}

//! CSV export of one year

use crate::error::CoreResult;
use crate::models::{Entry, Expense, Income};

pub const EXPENSE_HEADER: [&str; 5] = ["Type", "Category", "Amount", "Date", "Notes"];
pub const INCOME_HEADER: [&str; 4] = ["Type", "Source", "Amount", "Date"];

/// Download name for a year's export
pub fn export_file_name(year: i32) -> String {
    format!("fintrack-{}.csv", year)
}

/// Two sections in one document: expenses, then incomes, each with its own header row.
/// Records outside `year` are skipped.
pub fn export_year_csv(year: i32, expenses: &[Expense], incomes: &[Income]) -> CoreResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(EXPENSE_HEADER)?;
    for expense in expenses.iter().filter(|e| e.year() == year) {
        writer.write_record([
            "Expense".to_string(),
            expense.category.clone(),
            expense.amount.to_string(),
            expense.date.format("%Y-%m-%d").to_string(),
            expense.notes.clone().unwrap_or_default(),
        ])?;
    }

    writer.write_record(INCOME_HEADER)?;
    for income in incomes.iter().filter(|i| i.year() == year) {
        writer.write_record([
            "Income".to_string(),
            income.source.clone().unwrap_or_default(),
            income.amount.to_string(),
            income.date.format("%Y-%m-%d").to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| crate::error::CoreError::IoError { message: e.to_string() })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExpenseDraft;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_export_sections_and_year_filter() {
        let expenses = vec![
            ExpenseDraft::new(Decimal::new(1250, 2), "Food & Dining", d(2024, 3, 1))
                .with_notes(Some("lunch, with team".to_string()))
                .into_expense(1),
            ExpenseDraft::new(Decimal::from(5), "Home", d(2023, 3, 1)).into_expense(2),
        ];
        let incomes = vec![
            Income { id: 1, amount: Decimal::from(3000), date: d(2024, 1, 31), source: Some("Salary".to_string()) },
            Income { id: 2, amount: Decimal::from(1), date: d(2023, 1, 31), source: None },
        ];

        let bytes = export_year_csv(2024, &expenses, &incomes).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Type,Category,Amount,Date,Notes",
                "Expense,Food & Dining,12.5,2024-03-01,\"lunch, with team\"",
                "Type,Source,Amount,Date",
                "Income,Salary,3000,2024-01-31",
            ]
        );
    }

    #[test]
    fn test_export_empty_year_has_headers() {
        let bytes = export_year_csv(2030, &[], &[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "Type,Category,Amount,Date,Notes\nType,Source,Amount,Date\n");
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name(2024), "fintrack-2024.csv");
    }
}

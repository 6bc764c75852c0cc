//! Core data models

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::types::Frequency;

/// Stored expense record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    /// Shared by every expense generated from one recurring submission
    #[serde(default, rename = "recurring_id", alias = "recurring_group_id")]
    pub recurring_group_id: Option<String>,
}

/// Stored income record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    pub id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub source: Option<String>,
}

/// Anything with a date and an amount, used by the aggregation helpers
pub trait Entry {
    fn date(&self) -> NaiveDate;
    fn amount(&self) -> Decimal;

    /// `YYYY-MM` key of the entry's month
    fn month_key(&self) -> String {
        self.date().format("%Y-%m").to_string()
    }

    fn year(&self) -> i32 {
        self.date().year()
    }
}

impl Entry for Expense {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn amount(&self) -> Decimal {
        self.amount
    }
}

impl Entry for Income {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Expense waiting for an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub recurring_group_id: Option<String>,
}

impl ExpenseDraft {
    pub fn new(amount: Decimal, category: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            amount,
            category: category.into(),
            date,
            notes: None,
            frequency: None,
            recurring_group_id: None,
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = normalize_text(notes);
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_amount(self.amount)?;
        if self.category.trim().is_empty() {
            return Err(CoreError::validation("A category must be selected"));
        }
        Ok(())
    }

    pub fn into_expense(self, id: i64) -> Expense {
        Expense {
            id,
            amount: self.amount.normalize(),
            category: self.category.trim().to_string(),
            date: self.date,
            notes: normalize_text(self.notes),
            frequency: self.frequency,
            recurring_group_id: self.recurring_group_id,
        }
    }
}

/// Income waiting for an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeDraft {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub source: Option<String>,
}

impl IncomeDraft {
    pub fn new(amount: Decimal, date: NaiveDate, source: Option<String>) -> Self {
        Self {
            amount,
            date,
            source: normalize_text(source),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_amount(self.amount)
    }

    pub fn into_income(self, id: i64) -> Income {
        Income {
            id,
            amount: self.amount.normalize(),
            date: self.date,
            source: normalize_text(self.source),
        }
    }
}

/// Largest accepted amount (exclusive)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Most decimal places an amount may carry
pub const MAX_AMOUNT_SCALE: u32 = 4;

// Amounts are stored as f64; within these bounds every value has at most
// 13 significant digits and reads back unchanged.
pub(crate) fn validate_amount(amount: Decimal) -> CoreResult<()> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::validation("Amount must be a positive number"));
    }
    if amount >= MAX_AMOUNT {
        return Err(CoreError::validation(format!(
            "Amount must be less than {}",
            MAX_AMOUNT
        )));
    }
    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(CoreError::validation(format!(
            "Amount may have at most {} decimal places",
            MAX_AMOUNT_SCALE
        )));
    }
    Ok(())
}

/// Empty or whitespace-only text is stored as absent
pub fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse a user-entered amount such as `1,234.50` or `$12`
pub fn parse_amount(input: &str) -> CoreResult<Decimal> {
    let cleaned: String = input
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Err(CoreError::validation("Amount is required"));
    }
    let amount = Decimal::from_str(&cleaned)
        .map_err(|_| CoreError::validation(format!("'{}' is not a valid amount", input.trim())))?;
    validate_amount(amount)?;
    Ok(amount)
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(input: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| CoreError::validation(format!("'{}' is not a valid date (YYYY-MM-DD)", input.trim())))
}

/// `2024` or `2024-01`, checked before it is used as a date prefix
pub fn validate_period(period: &str) -> CoreResult<()> {
    let valid = match period.len() {
        4 => period.chars().all(|c| c.is_ascii_digit()),
        7 => {
            let (year, month) = period.split_at(4);
            year.chars().all(|c| c.is_ascii_digit())
                && month.starts_with('-')
                && matches!(month[1..].parse::<u32>(), Ok(1..=12))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CoreError::validation(format!("'{}' is not a period (YYYY or YYYY-MM)", period)))
    }
}

/// Whether a record date falls inside a period prefix
pub fn matches_period(date: NaiveDate, period: Option<&str>) -> bool {
    match period {
        None => true,
        Some(prefix) => date.format("%Y-%m-%d").to_string().starts_with(prefix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.50").unwrap(), Decimal::new(1250, 2));
        assert_eq!(parse_amount(" $1,234 ").unwrap(), Decimal::from(1234));
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-5").is_err());
    }

    #[test]
    fn test_amount_bounds() {
        assert_eq!(parse_amount("999999999.9999").unwrap(), Decimal::new(9_999_999_999_999, 4));
        assert_eq!(parse_amount("12.5000000").unwrap(), Decimal::new(125, 1));
        assert!(matches!(parse_amount("1000000000"), Err(CoreError::ValidationError { .. })));
        assert!(matches!(parse_amount("79228162514264337593543950335"), Err(CoreError::ValidationError { .. })));
        assert!(matches!(parse_amount("0.12345"), Err(CoreError::ValidationError { .. })));
        let draft = ExpenseDraft::new(Decimal::new(1, 5), "Home", d(2024, 1, 1));
        assert!(draft.validate().is_err());

        let padded = Decimal::from_str("12.500000000000000000000000").unwrap();
        let draft = ExpenseDraft::new(padded, "Home", d(2024, 1, 1));
        assert!(draft.validate().is_ok());
        assert_eq!(draft.into_expense(1).amount.scale(), 1);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-02-29").unwrap(), d(2024, 2, 29));
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("29/02/2024").is_err());
    }

    #[test]
    fn test_expense_draft_validation() {
        let draft = ExpenseDraft::new(Decimal::from(10), "Grocery", d(2024, 1, 1));
        assert!(draft.validate().is_ok());

        let draft = ExpenseDraft::new(Decimal::ZERO, "Grocery", d(2024, 1, 1));
        assert!(matches!(draft.validate(), Err(CoreError::ValidationError { .. })));

        let draft = ExpenseDraft::new(Decimal::from(10), "  ", d(2024, 1, 1));
        assert!(matches!(draft.validate(), Err(CoreError::ValidationError { .. })));
    }

    #[test]
    fn test_blank_notes_become_none() {
        let expense = ExpenseDraft::new(Decimal::from(3), "Food & Dining", d(2024, 5, 1))
            .with_notes(Some("   ".to_string()))
            .into_expense(7);
        assert_eq!(expense.id, 7);
        assert_eq!(expense.notes, None);
    }

    #[test]
    fn test_period_helpers() {
        assert!(validate_period("2024").is_ok());
        assert!(validate_period("2024-01").is_ok());
        assert!(validate_period("2024-13").is_err());
        assert!(validate_period("24-01").is_err());
        assert!(validate_period("2024%").is_err());

        assert!(matches_period(d(2024, 1, 15), Some("2024-01")));
        assert!(!matches_period(d(2024, 10, 15), Some("2024-01")));
        assert!(matches_period(d(2024, 10, 15), None));
    }

    #[test]
    fn test_expense_json_shape() {
        let json = r#"{"id": 3, "amount": 12.5, "category": "Home", "date": "2024-03-01",
                       "notes": null, "frequency": "Monthly", "recurring_id": "abc"}"#;
        let expense: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(expense.amount, Decimal::new(125, 1));
        assert_eq!(expense.frequency, Some(Frequency::Monthly));
        assert_eq!(expense.recurring_group_id.as_deref(), Some("abc"));

        let value = serde_json::to_value(&expense).unwrap();
        assert_eq!(value["date"], "2024-03-01");
        assert_eq!(value["amount"], 12.5);
        assert_eq!(value["recurring_id"], "abc");

        let renamed = json.replace("recurring_id", "recurring_group_id");
        let expense: Expense = serde_json::from_str(&renamed).unwrap();
        assert_eq!(expense.recurring_group_id.as_deref(), Some("abc"));
    }
}

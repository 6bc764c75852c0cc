//! `application/x-www-form-urlencoded` bodies from HTMX forms

use axum::response::{Html, IntoResponse, Response};
use fintrack_core::models::{normalize_text, parse_amount, parse_date};
use fintrack_core::{CoreError, CoreResult, ExpenseDraft, Frequency, IncomeDraft, RecurringRequest};

use crate::{alert_success, ApiResult, RECORDS_CHANGED};

/// Decoded form fields in submission order; keys may repeat (checkbox lists)
#[derive(Debug, Default, Clone)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

impl FormData {
    pub fn parse(body: &str) -> Self {
        let fields = body
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (decode(key), decode(value)),
                None => (decode(pair), String::new()),
            })
            .collect();
        Self { fields }
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed value, `None` when missing or blank
    pub fn text(&self, key: &str) -> Option<String> {
        normalize_text(self.get(key).map(str::to_string))
    }

    pub fn all(&self, key: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn required(&self, key: &str, label: &str) -> CoreResult<String> {
        self.text(key)
            .ok_or_else(|| CoreError::validation(format!("{} is required", label)))
    }

    /// Every `key` value parsed as a record id
    pub fn ids(&self, key: &str) -> CoreResult<Vec<i64>> {
        self.all(key)
            .into_iter()
            .map(|raw| {
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| CoreError::validation(format!("'{}' is not a record id", raw)))
            })
            .collect()
    }

    pub fn expense_draft(&self) -> CoreResult<ExpenseDraft> {
        let amount = parse_amount(self.get("amount").unwrap_or_default())?;
        let category = self
            .text("category")
            .ok_or_else(|| CoreError::validation("Please select a category"))?;
        let date = parse_date(&self.required("date", "Date")?)?;
        Ok(ExpenseDraft::new(amount, category, date).with_notes(self.text("notes")))
    }

    pub fn recurring_request(&self) -> CoreResult<RecurringRequest> {
        let amount = parse_amount(self.get("amount").unwrap_or_default())?;
        let category = self
            .text("category")
            .ok_or_else(|| CoreError::validation("Please select a category"))?;
        let start_date = parse_date(&self.required("start_date", "Start date")?)?;
        let end_date = parse_date(&self.required("end_date", "End date")?)?;
        let frequency = self
            .required("frequency", "Frequency")?
            .parse::<Frequency>()
            .map_err(CoreError::validation)?;
        Ok(RecurringRequest {
            amount,
            category,
            start_date,
            end_date,
            frequency,
            notes: self.text("notes"),
        })
    }

    pub fn income_draft(&self) -> CoreResult<IncomeDraft> {
        let amount = parse_amount(self.get("amount").unwrap_or_default())?;
        let date = parse_date(&self.required("date", "Date")?)?;
        Ok(IncomeDraft::new(amount, date, self.text("source")))
    }
}

/// Response to an HTMX form post: a success alert that also tells list
/// fragments to reload, or the error as an alert with its status code
pub fn form_outcome(operation: &str, result: ApiResult<String>) -> Response {
    match result {
        Ok(message) => (
            [("HX-Trigger", RECORDS_CHANGED)],
            Html(alert_success(&message)),
        )
            .into_response(),
        Err(e) => {
            e.log(operation);
            e.into_alert()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_parse_decodes_plus_and_percent() {
        let form = FormData::parse("category=Food+%26+Dining&notes=caf%C3%A9&empty=&flag");
        assert_eq!(form.get("category"), Some("Food & Dining"));
        assert_eq!(form.get("notes"), Some("café"));
        assert_eq!(form.get("empty"), Some(""));
        assert_eq!(form.text("empty"), None);
        assert_eq!(form.get("flag"), Some(""));
    }

    #[test]
    fn test_repeated_ids() {
        let form = FormData::parse("ids=3&ids=7&ids=12");
        assert_eq!(form.ids("ids").unwrap(), vec![3, 7, 12]);
        assert!(FormData::parse("ids=x").ids("ids").is_err());
        assert!(FormData::parse("").ids("ids").unwrap().is_empty());
    }

    #[test]
    fn test_expense_draft() {
        let form = FormData::parse("amount=%241%2C234.50&category=Home&date=2024-03-01&notes=+paint+");
        let draft = form.expense_draft().unwrap();
        assert_eq!(draft.amount, Decimal::from_str("1234.50").unwrap());
        assert_eq!(draft.category, "Home");
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(draft.notes.as_deref(), Some("paint"));
    }

    #[test]
    fn test_expense_draft_requires_category() {
        let form = FormData::parse("amount=5&category=&date=2024-03-01");
        let err = form.expense_draft().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Please select a category");
    }

    #[test]
    fn test_recurring_request_frequency() {
        let form = FormData::parse(
            "amount=50&category=Rent&start_date=2024-01-31&end_date=2024-04-30&frequency=monthly",
        );
        let request = form.recurring_request().unwrap();
        assert_eq!(request.frequency, Frequency::Monthly);

        let bad = FormData::parse("amount=50&category=Rent&start_date=2024-01-31&end_date=2024-04-30&frequency=daily");
        assert!(matches!(bad.recurring_request(), Err(CoreError::ValidationError { .. })));
    }

    #[test]
    fn test_income_draft_rejects_negative() {
        let form = FormData::parse("amount=-3&date=2024-01-01");
        assert!(form.income_draft().is_err());
    }
}

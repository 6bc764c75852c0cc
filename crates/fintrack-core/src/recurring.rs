//! Recurring expense expansion

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::models::{normalize_text, ExpenseDraft};
use crate::store::Store;
use crate::types::Frequency;

/// One recurring submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub frequency: Frequency,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Ids created for one recurring group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringOutcome {
    pub group_id: String,
    pub ids: Vec<i64>,
}

/// Dates from `start` to `end` inclusive.
///
/// The cursor advances from its previous value, so a day clamped at a
/// short month stays clamped: Jan 31, Feb 29, Mar 29, Apr 29.
pub fn occurrence_dates(start: NaiveDate, end: NaiveDate, frequency: Frequency) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut cursor = Some(start);
    while let Some(date) = cursor {
        if date > end {
            break;
        }
        dates.push(date);
        cursor = frequency.advance(date);
    }
    dates
}

/// Persist one expense per occurrence, all sharing a fresh group id.
///
/// Amount and category are checked once before anything is written. If a
/// write fails midway the error is returned and the occurrences already
/// written stay in the store.
pub fn expand_recurring(store: &mut dyn Store, request: RecurringRequest) -> CoreResult<RecurringOutcome> {
    let template = ExpenseDraft {
        amount: request.amount,
        category: request.category.trim().to_string(),
        date: request.start_date,
        notes: normalize_text(request.notes),
        frequency: Some(request.frequency),
        recurring_group_id: Some(fintrack_utils::generate_group_id()),
    };
    template.validate()?;

    let group_id = template.recurring_group_id.clone().unwrap_or_default();
    let dates = occurrence_dates(request.start_date, request.end_date, request.frequency);
    let mut ids = Vec::with_capacity(dates.len());

    for date in dates {
        let draft = ExpenseDraft { date, ..template.clone() };
        match store.add_expense(draft) {
            Ok(id) => ids.push(id),
            Err(e) => {
                log::error!(
                    "Recurring group {} stopped at {} after {} occurrences: {}",
                    group_id,
                    date,
                    ids.len(),
                    e
                );
                return Err(e);
            }
        }
    }

    log::info!(
        "Created {} {} expenses in group {}",
        ids.len(),
        request.frequency,
        group_id
    );
    Ok(RecurringOutcome { group_id, ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::store::testing::MemoryStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rent(start: NaiveDate, end: NaiveDate, frequency: Frequency) -> RecurringRequest {
        RecurringRequest {
            amount: Decimal::from(50),
            category: "Rent".to_string(),
            start_date: start,
            end_date: end,
            frequency,
            notes: None,
        }
    }

    #[test]
    fn test_monthly_from_month_end_carries_clamp() {
        let mut store = MemoryStore::new();
        let outcome = expand_recurring(&mut store, rent(d(2024, 1, 31), d(2024, 4, 30), Frequency::Monthly)).unwrap();

        assert_eq!(outcome.ids.len(), 4);
        let dates: Vec<NaiveDate> = store.expenses.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 29), d(2024, 4, 29)]);
        assert!(store
            .expenses
            .iter()
            .all(|e| e.recurring_group_id.as_deref() == Some(outcome.group_id.as_str())
                && e.frequency == Some(Frequency::Monthly)));
    }

    #[test]
    fn test_start_after_end_writes_nothing() {
        let mut store = MemoryStore::new();
        let outcome = expand_recurring(&mut store, rent(d(2024, 5, 1), d(2024, 4, 1), Frequency::Weekly)).unwrap();
        assert!(outcome.ids.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_invalid_amount_writes_nothing() {
        let mut store = MemoryStore::new();
        let mut request = rent(d(2024, 1, 1), d(2024, 12, 31), Frequency::Monthly);
        request.amount = Decimal::ZERO;
        let err = expand_recurring(&mut store, request).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError { .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_failure_midway_keeps_written_prefix() {
        let mut store = MemoryStore::new();
        store.fail_after = Some(2);
        let result = expand_recurring(&mut store, rent(d(2024, 1, 1), d(2024, 12, 1), Frequency::Monthly));
        assert!(matches!(result, Err(CoreError::IoError { .. })));
        assert_eq!(store.expenses.len(), 2);
    }

    #[test]
    fn test_groups_get_distinct_ids() {
        let mut store = MemoryStore::new();
        let a = expand_recurring(&mut store, rent(d(2024, 1, 1), d(2024, 1, 1), Frequency::Yearly)).unwrap();
        let b = expand_recurring(&mut store, rent(d(2024, 1, 1), d(2024, 1, 1), Frequency::Yearly)).unwrap();
        assert_ne!(a.group_id, b.group_id);
    }

    #[test]
    fn test_occurrence_dates() {
        assert_eq!(
            occurrence_dates(d(2024, 1, 1), d(2024, 1, 29), Frequency::Biweekly),
            vec![d(2024, 1, 1), d(2024, 1, 15), d(2024, 1, 29)]
        );
        assert_eq!(occurrence_dates(d(2024, 3, 1), d(2024, 3, 1), Frequency::Quarterly), vec![d(2024, 3, 1)]);
        assert_eq!(occurrence_dates(d(2024, 1, 1), d(2025, 12, 31), Frequency::Quarterly).len(), 8);
    }
}

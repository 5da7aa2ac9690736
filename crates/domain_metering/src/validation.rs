//! Entry-time validation of proposed bills
//!
//! [`validate`] returns every problem it finds, in a fixed order, so callers
//! can display them deterministically. An empty list means the candidate is
//! acceptable. Structural checks on imported data live in
//! [`crate::interchange`] and [`crate::backup`]; this module is only about
//! what a person typed in.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Kwh, Money};

use crate::bill::{Meter, MeterReadings, NewBill};

/// Raw field values as entered, before any parsing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBillInput {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub kwh: String,
    #[serde(default)]
    pub top: String,
    #[serde(default)]
    pub bottom: String,
}

/// A proposed bill whose fields may be missing or unparsable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillCandidate {
    pub date: Option<NaiveDate>,
    pub amount: Option<Money>,
    pub kwh: Option<Kwh>,
    pub top: Option<Kwh>,
    pub bottom: Option<Kwh>,
}

impl BillCandidate {
    /// Parses raw input; anything that does not parse becomes `None`
    pub fn parse(raw: &RawBillInput) -> Self {
        Self {
            date: NaiveDate::parse_from_str(raw.date.trim(), "%Y-%m-%d").ok(),
            amount: Money::parse(&raw.amount).ok(),
            kwh: Kwh::parse(&raw.kwh).ok(),
            top: Kwh::parse(&raw.top).ok(),
            bottom: Kwh::parse(&raw.bottom).ok(),
        }
    }

    /// Candidate built from an already typed bill
    pub fn from_new_bill(bill: &NewBill) -> Self {
        Self {
            date: Some(bill.date),
            amount: Some(bill.main.amount),
            kwh: Some(bill.main.kwh),
            top: Some(bill.readings.top),
            bottom: Some(bill.readings.bottom),
        }
    }

    /// The typed bill, once every field is present
    pub fn to_new_bill(&self) -> Option<NewBill> {
        Some(NewBill::new(
            self.date?,
            self.amount?,
            self.kwh?,
            self.top?,
            self.bottom?,
        ))
    }
}

/// A single reason a candidate bill was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// The date is empty or not `YYYY-MM-DD`
    DateMissing,
    /// Total kWh is missing, not a number, or not above zero
    KwhNotPositive,
    /// Total amount is missing, not a number, or not above zero
    AmountNotPositive,
    /// A sub-meter reading is missing or not a number
    ReadingMissing { meter: Meter },
    /// A sub-meter reading is lower than the one before it
    ReadingRegressed { meter: Meter, current: Kwh, previous: Kwh },
    /// The two tenants together consumed more than the main meter billed
    TenantsExceedTotal { tenants: Kwh, total: Kwh },
}

impl ValidationIssue {
    /// Name of the input field the issue is attached to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationIssue::DateMissing => "date",
            ValidationIssue::KwhNotPositive => "kwh",
            ValidationIssue::AmountNotPositive => "amount",
            ValidationIssue::ReadingMissing { meter }
            | ValidationIssue::ReadingRegressed { meter, .. } => meter.field_name(),
            ValidationIssue::TenantsExceedTotal { .. } => "kwh",
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::DateMissing => write!(f, "date is missing or invalid"),
            ValidationIssue::KwhNotPositive => write!(f, "total kWh must be a number greater than zero"),
            ValidationIssue::AmountNotPositive => write!(f, "amount must be a number greater than zero"),
            ValidationIssue::ReadingMissing { meter } => write!(f, "{} reading must be a number", meter),
            ValidationIssue::ReadingRegressed { meter, current, previous } => write!(
                f,
                "{} reading must not be lower than the previous reading ({} < {})",
                meter, current, previous
            ),
            ValidationIssue::TenantsExceedTotal { tenants, total } => write!(
                f,
                "combined tenant consumption ({}) exceeds the main meter total ({})",
                tenants, total
            ),
        }
    }
}

/// Validates a candidate bill against the readings that precede it.
///
/// Checks run in this order:
/// 1. total kWh is a positive number
/// 2. amount is a positive number
/// 3. top reading present and not below `previous.top`
/// 4. bottom reading present and not below `previous.bottom`
/// 5. combined tenant consumption does not exceed total kWh
///
/// A missing or unparsable date is reported first of all. Check 5 is skipped
/// when check 1 failed or a reading is missing, since there is no meaningful
/// total or delta to compare.
pub fn validate(candidate: &BillCandidate, previous: MeterReadings) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if candidate.date.is_none() {
        issues.push(ValidationIssue::DateMissing);
    }

    let total = candidate.kwh.filter(Kwh::is_positive);
    if total.is_none() {
        issues.push(ValidationIssue::KwhNotPositive);
    }

    if !candidate.amount.is_some_and(|amount| amount.is_positive()) {
        issues.push(ValidationIssue::AmountNotPositive);
    }

    for meter in Meter::ALL {
        let current = match meter {
            Meter::Top => candidate.top,
            Meter::Bottom => candidate.bottom,
        };
        let previous = previous.get(meter);
        match current {
            None => issues.push(ValidationIssue::ReadingMissing { meter }),
            Some(current) if current < previous => {
                issues.push(ValidationIssue::ReadingRegressed { meter, current, previous })
            }
            Some(_) => {}
        }
    }

    if let (Some(total), Some(top), Some(bottom)) = (total, candidate.top, candidate.bottom) {
        let tenants = (top - previous.top) + (bottom - previous.bottom);
        if tenants > total {
            issues.push(ValidationIssue::TenantsExceedTotal { tenants, total });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn previous() -> MeterReadings {
        MeterReadings::new(Kwh::new(dec!(1000)), Kwh::new(dec!(500)))
    }

    fn raw(amount: &str, kwh: &str, top: &str, bottom: &str) -> RawBillInput {
        RawBillInput {
            date: "2024-01-01".to_string(),
            amount: amount.to_string(),
            kwh: kwh.to_string(),
            top: top.to_string(),
            bottom: bottom.to_string(),
        }
    }

    #[test]
    fn test_valid_candidate_has_no_issues() {
        let candidate = BillCandidate::parse(&raw("300", "200", "1100", "560"));
        assert!(validate(&candidate, previous()).is_empty());
    }

    #[test]
    fn test_non_numeric_kwh_suppresses_overrun_check() {
        let candidate = BillCandidate::parse(&raw("300", "abc", "5000", "560"));
        assert_eq!(validate(&candidate, previous()), vec![ValidationIssue::KwhNotPositive]);
    }

    #[test]
    fn test_issue_serializes_with_code_tag() {
        let json = serde_json::to_value(ValidationIssue::ReadingMissing { meter: Meter::Top }).unwrap();
        assert_eq!(json["code"], "reading_missing");
        assert_eq!(json["meter"], "top");
    }
}

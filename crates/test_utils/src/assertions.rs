//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than a bare `assert_eq!`.

use core_kernel::Money;
use domain_metering::{Bill, BillMetrics, ValidationIssue};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the amounts differ by more than `tolerance`
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that tenant and common consumption add up to the main meter's kWh exactly
pub fn assert_conservation(bill: &Bill, metrics: &BillMetrics) {
    let sum = metrics.consumption_top + metrics.consumption_bottom + metrics.common_kwh;
    assert_eq!(
        sum, bill.main.kwh,
        "top ({}) + bottom ({}) + common ({}) != main ({})",
        metrics.consumption_top, metrics.consumption_bottom, metrics.common_kwh, bill.main.kwh
    );
}

/// Asserts that the three costs add up to the bill amount within ±0.02
pub fn assert_costs_cover_amount(bill: &Bill, metrics: &BillMetrics) {
    let sum = metrics.cost_top + metrics.cost_bottom + metrics.common_cost;
    assert_money_approx_eq(&sum, &bill.main.amount, Decimal::new(2, 2));
}

/// Asserts that the bills are in non-decreasing date order
pub fn assert_chronological(bills: &[Bill]) {
    for pair in bills.windows(2) {
        assert!(
            pair[0].date <= pair[1].date,
            "Bills out of order: {} before {}",
            pair[0].date,
            pair[1].date
        );
    }
}

/// Asserts that validation produced exactly these issue codes, in order
pub fn assert_issue_codes(issues: &[ValidationIssue], expected: &[&str]) {
    let codes: Vec<String> = issues
        .iter()
        .map(|issue| {
            serde_json::to_value(issue)
                .ok()
                .and_then(|v| v["code"].as_str().map(str::to_string))
                .unwrap_or_default()
        })
        .collect();
    assert_eq!(codes, expected, "Unexpected validation issues: {:?}", issues);
}

/// Asserts that a result is Ok and returns the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Asserts that an error matches a specific variant
#[macro_export]
macro_rules! assert_err_variant {
    ($result:expr, $pattern:pat) => {
        match $result {
            Ok(_) => panic!("Expected Err matching {}, got Ok", stringify!($pattern)),
            Err(ref e) => {
                assert!(
                    matches!(e, $pattern),
                    "Error {:?} does not match pattern {}",
                    e,
                    stringify!($pattern)
                );
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_money_approx_eq_passes() {
        assert_money_approx_eq(&Money::new(dec!(100.01)), &Money::new(dec!(100.00)), dec!(0.02));
    }

    #[test]
    #[should_panic(expected = "differ by more than tolerance")]
    fn test_assert_money_approx_eq_fails() {
        assert_money_approx_eq(&Money::new(dec!(100.05)), &Money::new(dec!(100.00)), dec!(0.02));
    }

    #[test]
    fn test_assert_err_variant_macro() {
        let result: Result<(), &str> = Err("boom");
        assert_err_variant!(result, &"boom");
    }
}

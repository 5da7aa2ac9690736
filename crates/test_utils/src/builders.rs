//! Test Data Builders
//!
//! Builder patterns for constructing bills and raw form input with sensible
//! defaults. Tests set only the fields they care about.

use chrono::NaiveDate;
use core_kernel::{BillId, Kwh, Money};
use domain_metering::{Bill, BillCandidate, NewBill, RawBillInput};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{date, kwh};

/// Builder for bills
///
/// Defaults to the January worked example.
pub struct TestBillBuilder {
    id: BillId,
    date: NaiveDate,
    amount: Money,
    kwh: Kwh,
    top: Kwh,
    bottom: Kwh,
}

impl Default for TestBillBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBillBuilder {
    pub fn new() -> Self {
        Self {
            id: BillId::new(),
            date: date("2024-01-01"),
            amount: Money::new(dec!(300)),
            kwh: kwh(dec!(200)),
            top: kwh(dec!(1100)),
            bottom: kwh(dec!(560)),
        }
    }

    pub fn with_id(mut self, id: BillId) -> Self {
        self.id = id;
        self
    }

    /// Sets the date from `YYYY-MM-DD`
    pub fn on(mut self, raw: &str) -> Self {
        self.date = date(raw);
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Money::new(amount);
        self
    }

    pub fn with_kwh(mut self, total: Decimal) -> Self {
        self.kwh = kwh(total);
        self
    }

    pub fn with_readings(mut self, top: Decimal, bottom: Decimal) -> Self {
        self.top = kwh(top);
        self.bottom = kwh(bottom);
        self
    }

    pub fn build_new(&self) -> NewBill {
        NewBill::new(self.date, self.amount, self.kwh, self.top, self.bottom)
    }

    pub fn build(&self) -> Bill {
        self.build_new().with_id(self.id)
    }

    pub fn candidate(&self) -> BillCandidate {
        BillCandidate::from_new_bill(&self.build_new())
    }
}

/// Builder for raw form input, every field as typed
pub struct TestRawInputBuilder {
    input: RawBillInput,
}

impl Default for TestRawInputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRawInputBuilder {
    /// Starts from the January worked example
    pub fn new() -> Self {
        Self {
            input: RawBillInput {
                date: "2024-01-01".into(),
                amount: "300".into(),
                kwh: "200".into(),
                top: "1100".into(),
                bottom: "560".into(),
            },
        }
    }

    pub fn date(mut self, value: &str) -> Self {
        self.input.date = value.into();
        self
    }

    pub fn amount(mut self, value: &str) -> Self {
        self.input.amount = value.into();
        self
    }

    pub fn kwh(mut self, value: &str) -> Self {
        self.input.kwh = value.into();
        self
    }

    pub fn top(mut self, value: &str) -> Self {
        self.input.top = value.into();
        self
    }

    pub fn bottom(mut self, value: &str) -> Self {
        self.input.bottom = value.into();
        self
    }

    pub fn build(self) -> RawBillInput {
        self.input
    }

    pub fn candidate(self) -> BillCandidate {
        BillCandidate::parse(&self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_builder_defaults() {
        let bill = TestBillBuilder::new().build();
        assert_eq!(bill.date, date("2024-01-01"));
        assert_eq!(bill.main.amount.amount(), dec!(300));
    }

    #[test]
    fn test_raw_builder_parses() {
        let candidate = TestRawInputBuilder::new().kwh("abc").candidate();
        assert!(candidate.kwh.is_none());
        assert!(candidate.amount.is_some());
    }
}

//! Property-Based Test Generators
//!
//! Proptest strategies for bills and readings. Quantities are whole or
//! two-place decimals, the precision meters and bills actually carry.

use core_kernel::{Kwh, Money};
use domain_metering::{MeterReadings, NewBill};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::fixtures::date;

/// Positive amount, 0.01 to 10 000.00
pub fn positive_amount_strategy() -> impl Strategy<Value = Money> {
    (1i64..1_000_000i64).prop_map(Money::from_minor)
}

/// Positive kWh with up to 2 decimal places, 0.01 to 100 000
pub fn positive_kwh_strategy() -> impl Strategy<Value = Kwh> {
    (1i64..10_000_000i64).prop_map(|n| Kwh::new(Decimal::new(n, 2)))
}

/// Cumulative reading, 0 to 1 000 000 kWh
pub fn reading_strategy() -> impl Strategy<Value = Kwh> {
    (0i64..100_000_000i64).prop_map(|n| Kwh::new(Decimal::new(n, 2)))
}

/// Previous readings of both meters
pub fn readings_strategy() -> impl Strategy<Value = MeterReadings> {
    (reading_strategy(), reading_strategy()).prop_map(|(top, bottom)| MeterReadings::new(top, bottom))
}

/// Any bill on a fixed date; readings are unrelated to any previous ones
pub fn new_bill_strategy() -> impl Strategy<Value = NewBill> {
    (
        positive_amount_strategy(),
        positive_kwh_strategy(),
        reading_strategy(),
        reading_strategy(),
    )
        .prop_map(|(amount, total, top, bottom)| {
            NewBill::new(date("2024-01-01"), amount, total, top, bottom)
        })
}

/// Previous readings plus a bill whose readings move forward from them
/// without exceeding the main meter's total
pub fn consistent_bill_strategy() -> impl Strategy<Value = (MeterReadings, NewBill)> {
    (readings_strategy(), positive_amount_strategy(), 1i64..10_000_000i64)
        .prop_flat_map(|(previous, amount, total_cents)| {
            (
                Just(previous),
                Just(amount),
                Just(total_cents),
                0..=total_cents,
            )
        })
        .prop_flat_map(|(previous, amount, total_cents, top_cents)| {
            (
                Just(previous),
                Just(amount),
                Just(total_cents),
                Just(top_cents),
                0..=(total_cents - top_cents),
            )
        })
        .prop_map(|(previous, amount, total_cents, top_cents, bottom_cents)| {
            let delta = |cents: i64| Kwh::new(Decimal::new(cents, 2));
            let bill = NewBill::new(
                date("2024-01-01"),
                amount,
                delta(total_cents),
                previous.top + delta(top_cents),
                previous.bottom + delta(bottom_cents),
            );
            (previous, bill)
        })
}

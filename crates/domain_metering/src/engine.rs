//! Consumption and cost engine
//!
//! Pure functions that derive per-period figures from a bill and the
//! readings that chronologically precede it. Nothing here touches storage.
//!
//! # Consumption semantics
//!
//! Two consumption variants exist on purpose:
//!
//! - [`consumption`] is raw. A regressed reading yields a negative delta,
//!   which per-bill metrics and the CSV export surface as an anomaly.
//! - [`clamped_consumption`] floors the delta at zero. Only [`summary`]
//!   uses it, so one bad entry cannot drag running totals below zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{percentage_of, round_to_minor, Kwh, Money, Rate};

use crate::bill::{BaselineSettings, Bill, MeterReadings};

/// Price per kWh of a bill; zero when the bill has no aggregate consumption
pub fn rate(bill: &Bill) -> Rate {
    Rate::per_kwh(bill.main.amount, bill.main.kwh)
}

/// Raw difference between two cumulative readings
pub fn consumption(current: Kwh, previous: Kwh) -> Kwh {
    current - previous
}

/// Difference between two cumulative readings, floored at zero
pub fn clamped_consumption(current: Kwh, previous: Kwh) -> Kwh {
    consumption(current, previous).clamp_non_negative()
}

/// Cost of a quantity at a rate, rounded half away from zero to the minor unit
///
/// Saturates when the product leaves the range of `Decimal`.
pub fn cost_for(consumption: Kwh, rate: Rate) -> Money {
    Money::new(round_to_minor(rate.apply(consumption)))
}

/// True when every figure of `bill` measured against `previous` fits in a `Decimal`
pub fn is_representable(bill: &Bill, previous: MeterReadings) -> bool {
    let rate = rate(bill);
    let (Some(top), Some(bottom)) = (
        bill.readings.top.checked_sub(previous.top),
        bill.readings.bottom.checked_sub(previous.bottom),
    ) else {
        return false;
    };
    let Some(common) = top.checked_add(bottom).and_then(|t| bill.main.kwh.checked_sub(t)) else {
        return false;
    };
    [top, bottom, common]
        .into_iter()
        .all(|kwh| rate.checked_apply(kwh).is_some())
}

/// Consumption and cost not attributable to either sub-meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonMetrics {
    pub kwh: Kwh,
    pub cost: Money,
}

/// Common-property usage for a bill.
///
/// A negative result means the tenants' reported consumption exceeds the main
/// meter's total; it is returned as is.
pub fn common_metrics(bill: &Bill, consumption_top: Kwh, consumption_bottom: Kwh) -> CommonMetrics {
    let kwh = bill.main.kwh - (consumption_top + consumption_bottom);
    CommonMetrics {
        kwh,
        cost: cost_for(kwh, rate(bill)),
    }
}

/// Every derived figure for a single bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillMetrics {
    pub rate: Rate,
    pub consumption_top: Kwh,
    pub consumption_bottom: Kwh,
    pub cost_top: Money,
    pub cost_bottom: Money,
    pub common_kwh: Kwh,
    pub common_cost: Money,
    /// Combined tenant consumption
    pub total_consumption: Kwh,
    /// Combined tenant cost
    pub total_cost: Money,
    pub has_anomaly: bool,
}

/// Derives the metrics of `bill` given the readings that precede it
pub fn bill_metrics(bill: &Bill, previous: MeterReadings) -> BillMetrics {
    let rate = rate(bill);

    let consumption_top = consumption(bill.readings.top, previous.top);
    let consumption_bottom = consumption(bill.readings.bottom, previous.bottom);

    let cost_top = cost_for(consumption_top, rate);
    let cost_bottom = cost_for(consumption_bottom, rate);

    let common = common_metrics(bill, consumption_top, consumption_bottom);

    let has_anomaly = consumption_top.is_negative()
        || consumption_bottom.is_negative()
        || common.kwh.is_negative()
        || !is_representable(bill, previous);

    BillMetrics {
        rate,
        consumption_top,
        consumption_bottom,
        cost_top,
        cost_bottom,
        common_kwh: common.kwh,
        common_cost: common.cost,
        total_consumption: consumption_top + consumption_bottom,
        total_cost: cost_top + cost_bottom,
        has_anomaly,
    }
}

/// A bill paired with the readings it was measured against and its metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeteredBill {
    pub bill: Bill,
    pub previous: MeterReadings,
    pub metrics: BillMetrics,
}

impl MeteredBill {
    /// Share of the main amount paid by each tenant and the common property,
    /// in whole percent
    pub fn cost_shares(&self) -> CostShares {
        let total = self.bill.main.amount.amount();
        CostShares {
            top: percentage_of(self.metrics.cost_top.amount(), total),
            bottom: percentage_of(self.metrics.cost_bottom.amount(), total),
            common: percentage_of(self.metrics.common_cost.amount(), total),
        }
    }
}

/// Whole-percent split of a bill's amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostShares {
    pub top: Decimal,
    pub bottom: Decimal,
    pub common: Decimal,
}

/// Walks the bills in order, pairing each with its chronological previous
/// readings.
///
/// `bills` must already be sorted by date. Returns `None` when the baseline
/// is unset and there is at least one bill to measure.
pub fn ledger_rows(bills: &[Bill], baseline: &BaselineSettings) -> Option<Vec<MeteredBill>> {
    if bills.is_empty() {
        return Some(Vec::new());
    }
    let mut previous = baseline.readings()?;

    let rows = bills
        .iter()
        .map(|bill| {
            let row = MeteredBill {
                bill: *bill,
                previous,
                metrics: bill_metrics(bill, previous),
            };
            previous = bill.readings;
            row
        })
        .collect();

    Some(rows)
}

/// Aggregate statistics over the whole ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub bill_count: usize,
    /// Combined tenant consumption, negative deltas floored at zero
    pub total_consumption: Kwh,
    /// Combined tenant cost
    pub total_cost: Money,
    /// `total_cost / total_consumption`, zero when nothing was consumed
    pub average_rate: Rate,
    /// `total_cost / bill_count`, zero for an empty ledger
    pub average_bill_cost: Money,
}

impl Summary {
    pub fn empty() -> Self {
        Self {
            bill_count: 0,
            total_consumption: Kwh::zero(),
            total_cost: Money::ZERO,
            average_rate: Rate::ZERO,
            average_bill_cost: Money::ZERO,
        }
    }
}

/// Summarises the ledger in a single chronological walk.
///
/// Each bill is measured against the readings of the bill before it (the
/// baseline for the first one). An unset baseline with bills present cannot
/// be measured and yields `None`.
pub fn summary(bills: &[Bill], baseline: &BaselineSettings) -> Option<Summary> {
    if bills.is_empty() {
        return Some(Summary::empty());
    }
    let mut previous = baseline.readings()?;

    let mut total_consumption = Kwh::zero();
    let mut total_cost = Money::ZERO;

    for bill in bills {
        let rate = rate(bill);
        let top = clamped_consumption(bill.readings.top, previous.top);
        let bottom = clamped_consumption(bill.readings.bottom, previous.bottom);

        total_consumption = total_consumption + top + bottom;
        total_cost = total_cost + cost_for(top, rate) + cost_for(bottom, rate);

        previous = bill.readings;
    }

    let average_rate = if total_consumption.is_positive() {
        let average = total_cost
            .amount()
            .checked_div(total_consumption.value())
            .unwrap_or(if total_cost.is_negative() { Decimal::MIN } else { Decimal::MAX });
        Rate::new(round_to_minor(average))
    } else {
        Rate::ZERO
    };
    let average_bill_cost = Money::new(round_to_minor(
        total_cost.amount() / Decimal::from(bills.len()),
    ));

    Some(Summary {
        bill_count: bills.len(),
        total_consumption: Kwh::new(total_consumption.value().round_dp(2)),
        total_cost: total_cost.round_to_minor(),
        average_rate,
        average_bill_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::BillId;
    use rust_decimal_macros::dec;

    use crate::bill::NewBill;

    fn kwh(v: Decimal) -> Kwh {
        Kwh::new(v)
    }

    fn bill(day: u32, amount: Decimal, total: Decimal, top: Decimal, bottom: Decimal) -> Bill {
        NewBill::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            Money::new(amount),
            kwh(total),
            kwh(top),
            kwh(bottom),
        )
        .with_id(BillId::new())
    }

    #[test]
    fn test_end_to_end_example() {
        let bill = bill(1, dec!(300), dec!(200), dec!(1100), dec!(560));
        let metrics = bill_metrics(&bill, MeterReadings::new(kwh(dec!(1000)), kwh(dec!(500))));

        assert_eq!(metrics.rate.as_decimal(), dec!(1.5));
        assert_eq!(metrics.consumption_top, kwh(dec!(100)));
        assert_eq!(metrics.consumption_bottom, kwh(dec!(60)));
        assert_eq!(metrics.cost_top.amount(), dec!(150.00));
        assert_eq!(metrics.cost_bottom.amount(), dec!(90.00));
        assert_eq!(metrics.common_kwh, kwh(dec!(40)));
        assert_eq!(metrics.common_cost.amount(), dec!(60.00));
        assert!(!metrics.has_anomaly);
    }

    #[test]
    fn test_raw_consumption_keeps_sign() {
        assert_eq!(consumption(kwh(dec!(110)), kwh(dec!(150))), kwh(dec!(-40)));
        assert_eq!(clamped_consumption(kwh(dec!(110)), kwh(dec!(150))), Kwh::zero());
    }

    #[test]
    fn test_zero_rate_costs_nothing() {
        let vacant = bill(1, dec!(20), dec!(0), dec!(1000), dec!(500));
        let metrics = bill_metrics(&vacant, MeterReadings::new(kwh(dec!(1010)), kwh(dec!(490))));

        assert!(metrics.rate.is_zero());
        assert!(metrics.cost_top.is_zero());
        assert!(metrics.cost_bottom.is_zero());
        assert!(metrics.common_cost.is_zero());
    }

    #[test]
    fn test_common_overrun_is_anomaly() {
        let overrun = bill(1, dec!(100), dec!(50), dec!(1040), dec!(530));
        let metrics = bill_metrics(&overrun, MeterReadings::new(kwh(dec!(1000)), kwh(dec!(500))));

        assert_eq!(metrics.common_kwh, kwh(dec!(-20)));
        assert!(metrics.common_cost.is_negative());
        assert!(metrics.has_anomaly);
    }

    #[test]
    fn test_summary_threads_previous_readings() {
        let bills = vec![
            bill(1, dec!(300), dec!(200), dec!(1100), dec!(560)),
            bill(2, dec!(150), dec!(100), dec!(1150), dec!(590)),
        ];
        let baseline = BaselineSettings::new(kwh(dec!(1000)), kwh(dec!(500)));

        let summary = summary(&bills, &baseline).unwrap();

        // 100 + 60 at 1.5, then 50 + 30 at 1.5
        assert_eq!(summary.bill_count, 2);
        assert_eq!(summary.total_consumption, kwh(dec!(240)));
        assert_eq!(summary.total_cost.amount(), dec!(360.00));
        assert_eq!(summary.average_rate.as_decimal(), dec!(1.50));
        assert_eq!(summary.average_bill_cost.amount(), dec!(180.00));
    }

    #[test]
    fn test_overflowing_costs_saturate_as_anomaly() {
        let extreme = bill(1, dec!(1000000), dec!(0.0000000001), dec!(1000000000000000000000000000), dec!(0));
        let previous = MeterReadings::new(Kwh::zero(), Kwh::zero());

        assert!(!is_representable(&extreme, previous));
        let metrics = bill_metrics(&extreme, previous);
        assert!(metrics.has_anomaly);
        assert_eq!(metrics.cost_top.amount(), Decimal::MAX.round_dp(4));

        let baseline = BaselineSettings::new(Kwh::zero(), Kwh::zero());
        let summary = summary(&[extreme], &baseline).unwrap();
        assert_eq!(summary.bill_count, 1);
    }

    #[test]
    fn test_summary_of_empty_ledger() {
        let summary = summary(&[], &BaselineSettings::unset()).unwrap();
        assert_eq!(summary, Summary::empty());
    }

    #[test]
    fn test_rows_need_baseline() {
        let bills = vec![bill(1, dec!(300), dec!(200), dec!(1100), dec!(560))];
        assert!(ledger_rows(&bills, &BaselineSettings::unset()).is_none());
    }
}

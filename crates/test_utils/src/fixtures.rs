//! Pre-built Test Fixtures
//!
//! Known bills and baselines whose derived figures have been worked out by
//! hand, so tests can assert exact values.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use core_kernel::{BillId, Kwh, ManualClock, Money};
use domain_metering::{
    BaselineSettings, Bill, IdGenerator, Ledger, LedgerConfig, MemoryStore, NewBill,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Shorthand for a kWh quantity
pub fn kwh(value: Decimal) -> Kwh {
    Kwh::new(value)
}

/// Parses a `YYYY-MM-DD` date, panicking on bad input
pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("fixture date must be YYYY-MM-DD")
}

/// Fixture for the single-bill worked example
///
/// Baseline (1000, 500); bill of 300 for 200 kWh with readings (1100, 560).
/// Rate 1.5, top 100 kWh / 150.00, bottom 60 kWh / 90.00, common 40 kWh / 60.00.
pub struct BillFixtures;

impl BillFixtures {
    pub fn baseline() -> BaselineSettings {
        BaselineSettings::new(kwh(dec!(1000)), kwh(dec!(500)))
    }

    pub fn january() -> NewBill {
        NewBill::new(
            date("2024-01-01"),
            Money::new(dec!(300)),
            kwh(dec!(200)),
            kwh(dec!(1100)),
            kwh(dec!(560)),
        )
    }

    /// A follow-up bill at the same rate: top 50 kWh, bottom 30 kWh
    pub fn february() -> NewBill {
        NewBill::new(
            date("2024-02-01"),
            Money::new(dec!(150)),
            kwh(dec!(100)),
            kwh(dec!(1150)),
            kwh(dec!(590)),
        )
    }
}

/// Fixture for the chronological threading scenario
///
/// Baseline (100, 50) and readings (120, 60), (150, 80), (110, 90). The
/// third bill is measured against the second and shows top consumption of
/// -40.
pub struct ThreadingFixtures;

impl ThreadingFixtures {
    pub fn baseline() -> BaselineSettings {
        BaselineSettings::new(kwh(dec!(100)), kwh(dec!(50)))
    }

    pub fn bills() -> Vec<NewBill> {
        [("2024-01-01", dec!(120), dec!(60)), ("2024-02-01", dec!(150), dec!(80)), ("2024-03-01", dec!(110), dec!(90))]
            .into_iter()
            .map(|(d, top, bottom)| {
                NewBill::new(date(d), Money::new(dec!(100)), kwh(dec!(100)), kwh(top), kwh(bottom))
            })
            .collect()
    }
}

/// Fixture for time
pub struct ClockFixtures;

impl ClockFixtures {
    /// Noon on 1 Jan 2024
    pub fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    pub fn manual() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Self::start()))
    }
}

/// Deterministic id generator: `BILL-00000000-0000-0000-0000-000000000001`, `...2`, and so on
#[derive(Debug, Clone, Default)]
pub struct SequenceIds {
    next: u128,
}

impl SequenceIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequenceIds {
    fn next_id(&mut self) -> BillId {
        self.next += 1;
        BillId::from_uuid(Uuid::from_u128(self.next))
    }
}

/// Id generator that always returns the same id
#[derive(Debug, Clone, Copy)]
pub struct RepeatingIds(pub BillId);

impl IdGenerator for RepeatingIds {
    fn next_id(&mut self) -> BillId {
        self.0
    }
}

/// Ledger over a fresh in-memory store with the default config
pub fn empty_ledger() -> (Ledger, MemoryStore, Arc<ManualClock>) {
    let store = MemoryStore::new();
    let clock = ClockFixtures::manual();
    let ledger = Ledger::open(store.clone(), LedgerConfig::default(), clock.clone())
        .expect("empty store always opens");
    (ledger, store, clock)
}

/// Ledger seeded with the baseline and bills of the threading scenario
pub fn threading_ledger() -> (Ledger, Vec<Bill>, Arc<ManualClock>) {
    let (mut ledger, _, clock) = empty_ledger();
    ledger
        .set_baseline(ThreadingFixtures::baseline())
        .expect("memory store has no quota");

    let mut ids = SequenceIds::new();
    let bills = ThreadingFixtures::bills()
        .into_iter()
        .map(|b| ledger.insert(b, &mut ids).expect("baseline is set"))
        .collect();
    (ledger, bills, clock)
}

//! Bill records and baseline readings
//!
//! A [`Bill`] captures one billing period: the aggregate main-meter bill and
//! the two cumulative sub-meter readings taken at the end of the period.
//! Derived figures (consumption, costs, common usage) are never stored here;
//! see [`crate::engine`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{BillId, Kwh, Money};

/// One of the two tracked sub-meters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Meter {
    /// The upper apartment
    Top,
    /// The lower apartment
    Bottom,
}

impl Meter {
    /// Both meters in display order
    pub const ALL: [Meter; 2] = [Meter::Top, Meter::Bottom];

    /// Field name used in serialized records
    pub fn field_name(&self) -> &'static str {
        match self {
            Meter::Top => "top",
            Meter::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// The aggregate bill for the whole meter over a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainReading {
    /// Total amount charged
    pub amount: Money,
    /// Total consumption billed
    pub kwh: Kwh,
}

/// Cumulative readings of both sub-meters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterReadings {
    pub top: Kwh,
    pub bottom: Kwh,
}

impl MeterReadings {
    pub fn new(top: Kwh, bottom: Kwh) -> Self {
        Self { top, bottom }
    }

    /// Returns the reading of a single meter
    pub fn get(&self, meter: Meter) -> Kwh {
        match meter {
            Meter::Top => self.top,
            Meter::Bottom => self.bottom,
        }
    }
}

/// A bill as proposed by a caller, before an id has been assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBill {
    pub date: NaiveDate,
    pub main: MainReading,
    pub readings: MeterReadings,
}

impl NewBill {
    pub fn new(date: NaiveDate, amount: Money, kwh: Kwh, top: Kwh, bottom: Kwh) -> Self {
        Self {
            date,
            main: MainReading { amount, kwh },
            readings: MeterReadings { top, bottom },
        }
    }

    /// Attaches an identifier
    pub fn with_id(self, id: BillId) -> Bill {
        Bill {
            id,
            date: self.date,
            main: self.main,
            readings: self.readings,
        }
    }
}

/// One billing period's record in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    /// Stable identifier, never changes once assigned
    pub id: BillId,
    /// Ordering key
    pub date: NaiveDate,
    pub main: MainReading,
    pub readings: MeterReadings,
}

impl Bill {
    /// Applies the present fields of a patch; the id is left untouched
    pub fn apply(&mut self, patch: &BillPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(main) = patch.main {
            self.main = main;
        }
        if let Some(readings) = patch.readings {
            self.readings = readings;
        }
    }
}

/// Partial update of a bill's mutable fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillPatch {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub main: Option<MainReading>,
    #[serde(default)]
    pub readings: Option<MeterReadings>,
}

impl BillPatch {
    /// A patch replacing every mutable field
    pub fn full(bill: &NewBill) -> Self {
        Self {
            date: Some(bill.date),
            main: Some(bill.main),
            readings: Some(bill.readings),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.main.is_none() && self.readings.is_none()
    }
}

/// Sub-meter readings at the moment tracking began
///
/// Both values are unset until the one-time setup step supplies them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineSettings {
    pub top: Option<Kwh>,
    pub bottom: Option<Kwh>,
}

impl BaselineSettings {
    pub fn new(top: Kwh, bottom: Kwh) -> Self {
        Self {
            top: Some(top),
            bottom: Some(bottom),
        }
    }

    /// Baseline with neither reading supplied
    pub fn unset() -> Self {
        Self::default()
    }

    /// True once both readings have been supplied
    pub fn is_set(&self) -> bool {
        self.top.is_some() && self.bottom.is_some()
    }

    /// Both readings, when set
    pub fn readings(&self) -> Option<MeterReadings> {
        match (self.top, self.bottom) {
            (Some(top), Some(bottom)) => Some(MeterReadings { top, bottom }),
            _ => None,
        }
    }
}

impl From<MeterReadings> for BaselineSettings {
    fn from(readings: MeterReadings) -> Self {
        Self::new(readings.top, readings.bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Bill {
        NewBill::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            Money::new(dec!(300)),
            Kwh::new(dec!(200)),
            Kwh::new(dec!(1100)),
            Kwh::new(dec!(560)),
        )
        .with_id(BillId::new())
    }

    #[test]
    fn test_patch_keeps_id_and_absent_fields() {
        let mut bill = sample();
        let id = bill.id;
        let patch = BillPatch {
            date: Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            ..Default::default()
        };

        bill.apply(&patch);

        assert_eq!(bill.id, id);
        assert_eq!(bill.date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(bill.readings.top, Kwh::new(dec!(1100)));
    }

    #[test]
    fn test_baseline_unset_until_both_present() {
        let partial = BaselineSettings {
            top: Some(Kwh::new(dec!(100))),
            bottom: None,
        };
        assert!(!partial.is_set());
        assert!(partial.readings().is_none());
        assert!(BaselineSettings::new(Kwh::zero(), Kwh::zero()).is_set());
    }

    #[test]
    fn test_bill_wire_shape() {
        let bill = sample();
        let json = serde_json::to_value(bill).unwrap();

        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["main"]["amount"], 300.0);
        assert_eq!(json["main"]["kwh"], 200.0);
        assert_eq!(json["readings"]["top"], 1100.0);
        assert_eq!(json["readings"]["bottom"], 560.0);
    }

    #[test]
    fn test_unset_baseline_serializes_nulls() {
        let json = serde_json::to_string(&BaselineSettings::unset()).unwrap();
        assert_eq!(json, r#"{"top":null,"bottom":null}"#);
    }
}

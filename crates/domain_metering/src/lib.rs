//! Metering Domain - Shared-meter bill splitting
//!
//! A single electricity meter is shared by two apartments, each with its own
//! cumulative sub-meter. Every billing period records the main bill (amount
//! and kWh) together with both sub-meter readings. From that this crate
//! derives what each apartment consumed and owes, and what is left over for
//! the common property.
//!
//! # Components
//!
//! - [`Ledger`]: ordered, persisted bill collection with observers and undo
//! - [`engine`]: pure consumption, cost and summary calculations
//! - [`validation`]: entry-time checks against the previous readings
//! - [`backup`]: backup documents and the remote blob store port
//! - [`interchange`]: CSV export and import
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_metering::{Ledger, LedgerConfig, MemoryStore, RandomIdGenerator};
//!
//! let mut ledger = Ledger::open(MemoryStore::new(), LedgerConfig::default(), clock)?;
//! ledger.set_baseline(BaselineSettings::new(top, bottom))?;
//! let bill = ledger.add_checked(&candidate, &mut RandomIdGenerator)?;
//!
//! for row in ledger.rows()? {
//!     println!("{} owes {}", Meter::Top, row.metrics.cost_top);
//! }
//! ```

pub mod bill;
pub mod engine;
pub mod validation;
pub mod store;
pub mod undo;
pub mod ledger;
pub mod backup;
pub mod interchange;
pub mod error;

pub use bill::{BaselineSettings, Bill, BillPatch, MainReading, Meter, MeterReadings, NewBill};
pub use engine::{BillMetrics, CommonMetrics, CostShares, MeteredBill, Summary};
pub use validation::{validate, BillCandidate, RawBillInput, ValidationIssue};
pub use store::{KeyValueStore, MemoryStore, StoreError, BILLS_KEY, SETTINGS_KEY};
pub use undo::{LedgerCommand, OperationKind, UndoConfig, UndoHistory, UndoOffer, UndoToken};
pub use ledger::{
    IdGenerator, Ledger, LedgerConfig, LedgerEvent, RandomIdGenerator, ReadingContext,
    SubscriptionId, MAX_ID_ATTEMPTS,
};
pub use backup::{normalize_backup_id, BackupBlobStore, BackupError, BackupHandle, BackupPayload};
pub use interchange::{CsvError, ImportLimits, ImportReport, RowIssue, SkipReason};
pub use error::LedgerError;

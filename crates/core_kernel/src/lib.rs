//! Core Kernel - Foundational types for the shared-meter bill splitter
//!
//! This crate provides the building blocks used by the metering domain and
//! its adapters:
//! - Money and per-kWh rate types with precise decimal arithmetic
//! - Energy quantities for meter readings and consumption deltas
//! - Strongly-typed identifiers
//! - A clock abstraction and the shared port error type

pub mod money;
pub mod energy;
pub mod identifiers;
pub mod clock;
pub mod ports;
pub mod error;

pub use money::{Money, Rate, MoneyError, percentage_of, round_to_minor};
pub use energy::Kwh;
pub use identifiers::BillId;
pub use clock::{Clock, SystemClock, ManualClock};
pub use ports::{PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable};
pub use error::CoreError;

//! Backup documents and the remote blob store port
//!
//! A backup is the whole ledger as JSON. Two shapes are accepted on restore:
//!
//! - structured: `{ "bills": [...], "settings": { "top": n, "bottom": n } }`
//! - legacy: a bare array of bills, restored with unset settings
//!
//! Every record is checked before anything is handed to the ledger, so a
//! restore either succeeds completely or leaves the ledger untouched.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

use chrono::NaiveDate;
use core_kernel::{BillId, DomainPort, Kwh, Money, PortError};

use crate::bill::{BaselineSettings, Bill, NewBill};
use crate::engine;
use crate::ledger::{IdGenerator, MAX_ID_ATTEMPTS};

/// Why a backup document was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackupError {
    /// The document as a whole has the wrong shape
    #[error("Malformed backup: {reason}")]
    Format { reason: String },

    /// A single record failed its checks; `record` is 1-based
    #[error("Malformed backup record #{record}: {reason}")]
    Record { record: usize, reason: String },

    /// The id generator kept producing ids already in the document
    #[error("Could not mint a unique bill id, last tried {id}")]
    IdsExhausted { id: BillId },
}

impl BackupError {
    fn format(reason: impl Into<String>) -> Self {
        BackupError::Format {
            reason: reason.into(),
        }
    }

    fn record(index: usize, reason: impl Into<String>) -> Self {
        BackupError::Record {
            record: index + 1,
            reason: reason.into(),
        }
    }

    /// 1-based number of the offending record, if the error is record-level
    pub fn record_number(&self) -> Option<usize> {
        match self {
            BackupError::Record { record, .. } => Some(*record),
            BackupError::Format { .. } | BackupError::IdsExhausted { .. } => None,
        }
    }
}

/// A backup document as found on the wire
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BackupDocument {
    Structured {
        bills: Vec<Value>,
        #[serde(default)]
        settings: Option<Value>,
    },
    Legacy(Vec<Value>),
}

/// A decoded, checked backup ready to replace the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPayload {
    pub bills: Vec<Bill>,
    pub settings: BaselineSettings,
}

/// Serializes the ledger in the structured backup shape
pub fn encode(bills: &[Bill], settings: &BaselineSettings) -> Result<String, BackupError> {
    #[derive(Serialize)]
    struct Document<'a> {
        bills: &'a [Bill],
        settings: &'a BaselineSettings,
    }

    serde_json::to_string_pretty(&Document { bills, settings })
        .map_err(|e| BackupError::format(e.to_string()))
}

/// Parses and checks a backup document
pub fn decode(raw: &str, ids: &mut impl IdGenerator) -> Result<BackupPayload, BackupError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| BackupError::format(format!("not valid JSON: {}", e)))?;
    decode_value(value, ids)
}

/// Checks an already parsed backup document
///
/// Ids are kept when they parse and are unique within the document;
/// anything else gets a fresh id from `ids`.
pub fn decode_value(value: Value, ids: &mut impl IdGenerator) -> Result<BackupPayload, BackupError> {
    let document = BackupDocument::deserialize(value).map_err(|_| {
        BackupError::format("expected an object with a 'bills' array, or an array of bills")
    })?;

    let (records, settings) = match document {
        BackupDocument::Structured { bills, settings } => {
            let settings = match settings {
                None | Some(Value::Null) => BaselineSettings::unset(),
                Some(value) => decode_settings(&value)?,
            };
            (bills, settings)
        }
        BackupDocument::Legacy(bills) => (bills, BaselineSettings::unset()),
    };

    let mut seen = HashSet::with_capacity(records.len());
    let mut bills = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let new_bill = decode_record(index, record).inspect_err(|e| warn!(error = %e, "Rejected backup"))?;

        let kept = record
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<BillId>().ok())
            .filter(|id| !seen.contains(id));
        let id = match kept {
            Some(id) => id,
            None => fresh_id(ids, &seen)?,
        };
        seen.insert(id);
        bills.push(new_bill.with_id(id));
    }

    check_costs(&bills, &settings)?;
    Ok(BackupPayload { bills, settings })
}

fn fresh_id(ids: &mut impl IdGenerator, seen: &HashSet<BillId>) -> Result<BillId, BackupError> {
    let mut last = ids.next_id();
    for _ in 1..MAX_ID_ATTEMPTS {
        if !seen.contains(&last) {
            return Ok(last);
        }
        last = ids.next_id();
    }
    if seen.contains(&last) {
        return Err(BackupError::IdsExhausted { id: last });
    }
    Ok(last)
}

/// Rejects the first record, in date order, whose costs overflow against the
/// record before it. Without a baseline nothing can be measured yet.
fn check_costs(bills: &[Bill], settings: &BaselineSettings) -> Result<(), BackupError> {
    let Some(mut previous) = settings.readings() else {
        return Ok(());
    };
    let mut order: Vec<usize> = (0..bills.len()).collect();
    order.sort_by_key(|&i| bills[i].date);
    for index in order {
        let bill = &bills[index];
        if !engine::is_representable(bill, previous) {
            return Err(BackupError::record(index, "costs exceed the representable range"));
        }
        previous = bill.readings;
    }
    Ok(())
}

fn decode_record(index: usize, record: &Value) -> Result<NewBill, BackupError> {
    let record = record
        .as_object()
        .ok_or_else(|| BackupError::record(index, "record is not an object"))?;

    let date = record
        .get("date")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        .ok_or_else(|| BackupError::record(index, "date is missing or invalid"))?;

    let main = record.get("main").and_then(Value::as_object);
    let (amount, kwh) = match main.map(|m| (number(m, "amount"), number(m, "kwh"))) {
        Some((Some(amount), Some(kwh))) => (amount, kwh),
        _ => return Err(BackupError::record(index, "main bill data is invalid")),
    };

    let readings = record.get("readings").and_then(Value::as_object);
    let (top, bottom) = match readings.map(|r| (number(r, "top"), number(r, "bottom"))) {
        Some((Some(top), Some(bottom))) => (top, bottom),
        _ => return Err(BackupError::record(index, "meter readings are invalid")),
    };

    if top.is_sign_negative() || bottom.is_sign_negative() {
        return Err(BackupError::record(index, "meter readings cannot be negative"));
    }

    Ok(NewBill::new(
        date,
        Money::new(amount),
        Kwh::new(kwh),
        Kwh::new(top),
        Kwh::new(bottom),
    ))
}

fn decode_settings(value: &Value) -> Result<BaselineSettings, BackupError> {
    let settings = value
        .as_object()
        .ok_or_else(|| BackupError::format("settings must be an object"))?;

    let reading = |key: &str| -> Result<Option<Kwh>, BackupError> {
        match settings.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => match number(settings, key) {
                Some(v) if v.is_sign_negative() && !v.is_zero() => Err(BackupError::format(format!(
                    "settings.{} cannot be negative",
                    key
                ))),
                Some(v) => Ok(Some(Kwh::new(v))),
                None => Err(BackupError::format(format!("settings.{} must be a number or null", key))),
            },
        }
    };

    Ok(BaselineSettings {
        top: reading("top")?,
        bottom: reading("bottom")?,
    })
}

fn number(object: &Map<String, Value>, key: &str) -> Option<rust_decimal::Decimal> {
    match object.get(key)? {
        Value::Number(n) => core_kernel::money::parse_decimal(&n.to_string()).ok(),
        _ => None,
    }
}

/// Extracts a backup id from user input
///
/// A pasted hosting URL of the form `.../api/json/<id>` or `.../get/<id>` is
/// reduced to its id; anything else is taken as the id itself. Blank input
/// yields `None`.
pub fn normalize_backup_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    for marker in ["/api/json/", "/get/"] {
        if let Some(start) = input.find(marker) {
            let id: String = input[start + marker.len()..]
                .chars()
                .take_while(char::is_ascii_alphanumeric)
                .collect();
            if !id.is_empty() {
                return Some(id);
            }
        }
    }

    Some(input.to_string())
}

/// Where a saved backup lives and the secret that allows overwriting it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupHandle {
    pub id: String,
    pub edit_key: String,
}

/// Remote storage for backup documents
#[async_trait]
pub trait BackupBlobStore: DomainPort {
    /// Raw document stored under `id`, `None` when there is none
    async fn fetch(&self, id: &str) -> Result<Option<String>, PortError>;

    /// Stores a new document and returns its id and edit key
    async fn create(&self, payload: &str) -> Result<BackupHandle, PortError>;

    /// Overwrites the document under `id`; fails unless `edit_key` matches
    async fn update(&self, id: &str, edit_key: &str, payload: &str) -> Result<(), PortError>;
}

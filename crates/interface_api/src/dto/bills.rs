//! Bill DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domain_metering::{
    Bill, BillCandidate, BillMetrics, CostShares, MeterReadings, MeteredBill, OperationKind,
    RawBillInput, UndoOffer,
};

/// A form field sent either as text or as a JSON number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(serde_json::Number),
    Text(String),
}

impl FieldValue {
    fn into_text(self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s,
        }
    }
}

fn text(field: Option<FieldValue>) -> String {
    field.map(FieldValue::into_text).unwrap_or_default()
}

/// Body of a bill create or update
///
/// Missing fields are treated as empty input and reported by validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillRequest {
    #[serde(default)]
    pub date: Option<FieldValue>,
    #[serde(default)]
    pub amount: Option<FieldValue>,
    #[serde(default)]
    pub kwh: Option<FieldValue>,
    #[serde(default)]
    pub top: Option<FieldValue>,
    #[serde(default)]
    pub bottom: Option<FieldValue>,
}

impl BillRequest {
    pub fn into_raw(self) -> RawBillInput {
        RawBillInput {
            date: text(self.date),
            amount: text(self.amount),
            kwh: text(self.kwh),
            top: text(self.top),
            bottom: text(self.bottom),
        }
    }

    pub fn into_candidate(self) -> BillCandidate {
        BillCandidate::parse(&self.into_raw())
    }
}

/// A bill with the figures derived from its predecessor
///
/// The derived fields are absent while the baseline is unset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRowResponse {
    #[serde(flatten)]
    pub bill: Bill,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<MeterReadings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BillMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<CostShares>,
}

impl BillRowResponse {
    pub fn unmeasured(bill: Bill) -> Self {
        Self {
            bill,
            previous: None,
            metrics: None,
            shares: None,
        }
    }
}

impl From<MeteredBill> for BillRowResponse {
    fn from(row: MeteredBill) -> Self {
        Self {
            bill: row.bill,
            previous: Some(row.previous),
            metrics: Some(row.metrics),
            shares: Some(row.cost_shares()),
        }
    }
}

/// Returned after a delete; `token` reverts it until `expiresAt`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoOfferResponse {
    pub token: u64,
    pub kind: OperationKind,
    pub bill: Bill,
    pub expires_at: DateTime<Utc>,
}

impl From<UndoOffer> for UndoOfferResponse {
    fn from(offer: UndoOffer) -> Self {
        Self {
            token: offer.token.0,
            kind: offer.kind,
            bill: offer.bill,
            expires_at: offer.expires_at,
        }
    }
}

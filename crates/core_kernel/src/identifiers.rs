//! Bill identifiers
//!
//! Ids are UUIDs. They are stored and sent as the bare UUID and displayed
//! with a `BILL-` prefix, which parsing also accepts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const BILL_PREFIX: &str = "BILL-";

/// Identifier of one bill, stable across edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillId(Uuid);

impl BillId {
    /// Random (v4) id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Time-ordered (v7) id; later ids sort after earlier ones
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BillId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", BILL_PREFIX, self.0)
    }
}

impl FromStr for BillId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix(BILL_PREFIX).unwrap_or(s);
        Uuid::parse_str(bare).map(Self)
    }
}

impl From<Uuid> for BillId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<BillId> for Uuid {
    fn from(id: BillId) -> Uuid {
        id.0
    }
}

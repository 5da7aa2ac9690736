//! The bill ledger
//!
//! [`Ledger`] owns the ordered bill collection and the baseline readings,
//! persists both through a [`KeyValueStore`] after every mutation, and tells
//! subscribers what changed.
//!
//! # Invariants
//!
//! - Bills are sorted ascending by date; equal dates keep insertion order
//! - Every bill id is unique
//! - The previous readings of a bill are those of the bill before it, or the
//!   baseline for the first bill
//!
//! Regressed readings are not a storage error. Only [`Ledger::add_checked`]
//! and [`Ledger::update_checked`] reject them, at entry time.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use core_kernel::{BillId, Clock};

use crate::backup::{self, BackupError, BackupPayload};
use crate::bill::{BaselineSettings, Bill, BillPatch, MeterReadings, NewBill};
use crate::engine::{self, MeteredBill, Summary};
use crate::error::LedgerError;
use crate::interchange::{self, ImportLimits, ImportReport, SkipReason};
use crate::store::{KeyValueStore, BILLS_KEY, SETTINGS_KEY};
use crate::undo::{LedgerCommand, UndoConfig, UndoHistory, UndoOffer, UndoRejection, UndoToken};
use crate::validation::{validate, BillCandidate};

/// How many fresh ids are tried before giving up on a collision
pub const MAX_ID_ATTEMPTS: usize = 5;

/// Source of new bill ids
pub trait IdGenerator {
    fn next_id(&mut self) -> BillId;
}

/// Time-ordered random ids
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self) -> BillId {
        BillId::new_v7()
    }
}

/// Ledger tuning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerConfig {
    pub undo: UndoConfig,
    pub import_limits: ImportLimits,
}

/// Which bill the previous readings are wanted for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingContext {
    /// A bill already in the ledger
    Existing(BillId),
    /// A bill about to be added
    New,
}

/// Change notification sent to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    BillsUpdated(Vec<Bill>),
    SettingsUpdated(BaselineSettings),
}

/// Handle returned by [`Ledger::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&LedgerEvent) + Send + Sync>;

/// The ordered, persisted collection of bills plus baseline readings
pub struct Ledger {
    bills: Vec<Bill>,
    baseline: BaselineSettings,
    store: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    undo: UndoHistory,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("bills", &self.bills.len())
            .field("baseline", &self.baseline)
            .field("undo", &self.undo.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Ledger {
    /// Loads the ledger from `store`
    ///
    /// Absent keys give an empty ledger with unset baseline.
    ///
    /// # Errors
    ///
    /// - `CorruptStore` if a stored value is not the expected JSON
    /// - `Store` if the store cannot be read
    pub fn open(
        store: impl KeyValueStore + 'static,
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LedgerError> {
        let mut bills: Vec<Bill> = load_json(&store, BILLS_KEY)?.unwrap_or_default();
        let baseline: BaselineSettings = load_json(&store, SETTINGS_KEY)?.unwrap_or_default();
        bills.sort_by_key(|b| b.date);

        info!(
            bills = bills.len(),
            baseline_set = baseline.is_set(),
            "Ledger opened"
        );

        Ok(Self {
            bills,
            baseline,
            store: Box::new(store),
            clock,
            undo: UndoHistory::new(config.undo),
            config,
            listeners: Vec::new(),
            next_subscription: 1,
        })
    }

    // ----- reads -----

    /// All bills in ledger order
    pub fn bills(&self) -> Vec<Bill> {
        self.bills.clone()
    }

    pub fn bill(&self, id: BillId) -> Option<Bill> {
        self.bills.iter().find(|b| b.id == id).copied()
    }

    pub fn baseline(&self) -> BaselineSettings {
        self.baseline
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_set()
    }

    pub fn len(&self) -> usize {
        self.bills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bills.is_empty()
    }

    /// Dates already taken by a bill
    pub fn dates(&self) -> HashSet<NaiveDate> {
        self.bills.iter().map(|b| b.date).collect()
    }

    /// Readings that chronologically precede the bill in `context`
    ///
    /// A new bill is measured against the last bill in the ledger, or the
    /// baseline when the ledger is empty.
    pub fn previous_readings_for(&self, context: ReadingContext) -> Result<MeterReadings, LedgerError> {
        let previous_bill = match context {
            ReadingContext::Existing(id) => {
                let index = self.position(id)?;
                index.checked_sub(1).map(|i| &self.bills[i])
            }
            ReadingContext::New => self.bills.last(),
        };

        match previous_bill {
            Some(bill) => Ok(bill.readings),
            None => self.baseline.readings().ok_or(LedgerError::BaselineNotSet),
        }
    }

    /// Every bill with its previous readings and derived metrics
    pub fn rows(&self) -> Result<Vec<MeteredBill>, LedgerError> {
        engine::ledger_rows(&self.bills, &self.baseline).ok_or(LedgerError::BaselineNotSet)
    }

    pub fn summary(&self) -> Result<Summary, LedgerError> {
        engine::summary(&self.bills, &self.baseline).ok_or(LedgerError::BaselineNotSet)
    }

    /// Token of the undo offer still open, if any
    pub fn pending_undo(&self) -> Option<UndoToken> {
        self.undo.pending_token(self.clock.now())
    }

    // ----- mutations -----

    /// Adds a bill under a freshly minted id
    ///
    /// # Errors
    ///
    /// - `BaselineNotSet` before the baseline has been supplied
    /// - `DuplicateId` if `ids` keeps colliding with existing bills
    /// - `StorageQuota`/`Store` if persisting failed; the bill is still added
    pub fn insert(&mut self, new_bill: NewBill, ids: &mut impl IdGenerator) -> Result<Bill, LedgerError> {
        if !self.has_baseline() {
            return Err(LedgerError::BaselineNotSet);
        }
        let id = mint_id(&self.bills, ids)?;
        let bill = new_bill.with_id(id);

        self.undo.supersede();
        self.bills.push(bill);
        self.sort();
        info!(bill_id = %id, date = %bill.date, "Bill added");

        self.commit_bills()?;
        Ok(bill)
    }

    /// Merges `patch` into the bill with `id`; the id never changes
    pub fn update_by_id(&mut self, id: BillId, patch: BillPatch) -> Result<Bill, LedgerError> {
        let index = self.position(id)?;
        self.undo.supersede();

        let bill = &mut self.bills[index];
        bill.apply(&patch);
        let updated = *bill;
        self.sort();
        info!(bill_id = %id, date = %updated.date, "Bill updated");

        self.commit_bills()?;
        Ok(updated)
    }

    /// Removes the bill with `id` and offers to undo the removal
    pub fn delete_by_id(&mut self, id: BillId) -> Result<UndoOffer, LedgerError> {
        let index = self.position(id)?;
        let command = LedgerCommand::Delete {
            bill: self.bills[index],
            index,
        };
        command.apply(&mut self.bills);
        let offer = self.undo.record(command, self.clock.now());
        info!(bill_id = %id, token = offer.token.0, "Bill deleted");

        self.commit_bills()?;
        Ok(offer)
    }

    /// Reverts the operation behind `token`
    ///
    /// # Errors
    ///
    /// - `UndoExpired` once the offer's window has closed
    /// - `NoPendingUndo` if the offer was superseded or never existed
    pub fn undo(&mut self, token: UndoToken) -> Result<Bill, LedgerError> {
        let command = self
            .undo
            .take(token, self.clock.now())
            .map_err(|rejection| match rejection {
                UndoRejection::Expired => LedgerError::UndoExpired,
                UndoRejection::NoPending => LedgerError::NoPendingUndo,
            })?;

        command.revert(&mut self.bills);
        let restored = command.affected();
        info!(bill_id = %restored, kind = ?command.kind(), "Operation undone");

        self.commit_bills()?;
        self.bill(restored).ok_or(LedgerError::NotFound { id: restored })
    }

    /// Overwrites bills and baseline wholesale
    ///
    /// Bills are re-sorted. Duplicate ids are rejected before anything changes.
    pub fn replace_all(&mut self, mut bills: Vec<Bill>, settings: BaselineSettings) -> Result<(), LedgerError> {
        let mut seen = HashSet::with_capacity(bills.len());
        if let Some(dup) = bills.iter().find(|b| !seen.insert(b.id)) {
            return Err(LedgerError::DuplicateId { id: dup.id });
        }

        bills.sort_by_key(|b| b.date);
        self.undo.supersede();
        self.bills = bills;
        self.baseline = settings;
        info!(bills = self.bills.len(), baseline_set = settings.is_set(), "Ledger replaced");

        let bills_saved = self.persist_bills();
        let settings_saved = self.persist_settings();
        self.notify(LedgerEvent::BillsUpdated(self.bills.clone()));
        self.notify(LedgerEvent::SettingsUpdated(self.baseline));
        bills_saved.and(settings_saved)
    }

    /// Sets the baseline readings; only the earliest bill's metrics change
    pub fn set_baseline(&mut self, settings: BaselineSettings) -> Result<(), LedgerError> {
        self.undo.supersede();
        self.baseline = settings;
        info!(top = ?settings.top, bottom = ?settings.bottom, "Baseline updated");

        let saved = self.persist_settings();
        self.notify(LedgerEvent::SettingsUpdated(self.baseline));
        saved
    }

    /// Drops every bill, the baseline and the undo history
    pub fn clear_all(&mut self) -> Result<(), LedgerError> {
        self.bills.clear();
        self.baseline = BaselineSettings::unset();
        self.undo.clear();
        warn!("All ledger data cleared");

        let bills_removed = self.store.remove(BILLS_KEY).map_err(LedgerError::from);
        let settings_removed = self.store.remove(SETTINGS_KEY).map_err(LedgerError::from);
        self.notify(LedgerEvent::BillsUpdated(Vec::new()));
        self.notify(LedgerEvent::SettingsUpdated(self.baseline));
        bills_removed.and(settings_removed)
    }

    /// Writes the current state again, e.g. after freeing space
    pub fn flush(&mut self) -> Result<(), LedgerError> {
        self.persist_bills()?;
        self.persist_settings()
    }

    // ----- checked entry -----

    /// Validates `candidate` against the last bill (or baseline) and adds it
    pub fn add_checked(
        &mut self,
        candidate: &BillCandidate,
        ids: &mut impl IdGenerator,
    ) -> Result<Bill, LedgerError> {
        let previous = self.previous_readings_for(ReadingContext::New)?;
        let new_bill = accept(candidate, previous)?;
        self.insert(new_bill, ids)
    }

    /// Validates `candidate` against the bill before `id` and replaces its fields
    ///
    /// A changed date is checked against the bill preceding the old position,
    /// not the one it will follow once re-sorted.
    pub fn update_checked(&mut self, id: BillId, candidate: &BillCandidate) -> Result<Bill, LedgerError> {
        let previous = self.previous_readings_for(ReadingContext::Existing(id))?;
        let new_bill = accept(candidate, previous)?;
        self.update_by_id(id, BillPatch::full(&new_bill))
    }

    // ----- interchange -----

    /// Merges the rows of a CSV file into the ledger
    ///
    /// Rows whose date is already taken are skipped and reported, as are rows
    /// whose costs overflow against the readings they end up following.
    pub fn import_csv(&mut self, input: &[u8], ids: &mut impl IdGenerator) -> Result<ImportReport, LedgerError> {
        let mut report = interchange::import(input, &self.dates(), &self.config.import_limits)?;

        let mut merged = self.bills.clone();
        let mut imported = Vec::with_capacity(report.accepted.len());
        for new_bill in &report.accepted {
            let id = mint_id(&merged, ids)?;
            merged.push(new_bill.with_id(id));
            imported.push(id);
        }
        merged.sort_by_key(|b| b.date);

        let overflowing = self.overflowing_imports(&merged, &imported);
        if !overflowing.is_empty() {
            warn!(rows = overflowing.len(), "Imported rows out of range");
            report.reject_where(SkipReason::OutOfRange, |index| overflowing.contains(&imported[index]));
            merged.retain(|b| !overflowing.contains(&b.id));
        }

        info!(
            accepted = report.accepted.len(),
            skipped = report.skipped.len(),
            "CSV import read"
        );
        if report.accepted.is_empty() {
            return Ok(report);
        }
        self.replace_all(merged, self.baseline)?;
        Ok(report)
    }

    /// Ids among `imported` whose figures cannot be represented, walking
    /// `merged` in date order and measuring each bill against the last kept one
    fn overflowing_imports(&self, merged: &[Bill], imported: &[BillId]) -> HashSet<BillId> {
        let mut rejected = HashSet::new();
        let Some(mut previous) = self.baseline.readings() else {
            return rejected;
        };
        for bill in merged {
            if imported.contains(&bill.id) && !engine::is_representable(bill, previous) {
                rejected.insert(bill.id);
                continue;
            }
            previous = bill.readings;
        }
        rejected
    }

    /// The ledger as CSV
    pub fn export_csv(&self, with_bom: bool) -> Result<String, LedgerError> {
        Ok(interchange::export(&self.rows()?, with_bom)?)
    }

    /// The ledger as a structured backup document
    pub fn backup_document(&self) -> Result<String, LedgerError> {
        Ok(backup::encode(&self.bills, &self.baseline)?)
    }

    /// Replaces the ledger with the contents of a backup document
    pub fn restore_backup(&mut self, raw: &str, ids: &mut impl IdGenerator) -> Result<BackupPayload, LedgerError> {
        let payload = backup::decode(raw, ids).map_err(|e| match e {
            BackupError::IdsExhausted { id } => LedgerError::DuplicateId { id },
            other => LedgerError::MalformedBackup(other),
        })?;
        self.replace_all(payload.bills.clone(), payload.settings)?;
        Ok(payload)
    }

    // ----- observers -----

    /// Registers `listener` for every subsequent change
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&LedgerEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener; false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // ----- internals -----

    fn position(&self, id: BillId) -> Result<usize, LedgerError> {
        self.bills
            .iter()
            .position(|b| b.id == id)
            .ok_or(LedgerError::NotFound { id })
    }

    fn sort(&mut self) {
        self.bills.sort_by_key(|b| b.date);
    }

    fn notify(&self, event: LedgerEvent) {
        for (_, listener) in &self.listeners {
            listener(&event);
        }
    }

    /// Persists bills, then notifies whatever the outcome
    fn commit_bills(&mut self) -> Result<(), LedgerError> {
        let saved = self.persist_bills();
        self.notify(LedgerEvent::BillsUpdated(self.bills.clone()));
        saved
    }

    fn persist_bills(&mut self) -> Result<(), LedgerError> {
        let json = serde_json::to_string(&self.bills)
            .map_err(|e| LedgerError::Store(crate::store::StoreError::io(BILLS_KEY, e)))?;
        self.save(BILLS_KEY, &json)
    }

    fn persist_settings(&mut self) -> Result<(), LedgerError> {
        let json = serde_json::to_string(&self.baseline)
            .map_err(|e| LedgerError::Store(crate::store::StoreError::io(SETTINGS_KEY, e)))?;
        self.save(SETTINGS_KEY, &json)
    }

    fn save(&mut self, key: &str, json: &str) -> Result<(), LedgerError> {
        debug!(key, bytes = json.len(), "Persisting");
        self.store.save(key, json).map_err(|e| {
            warn!(key, error = %e, "Persisting ledger failed");
            LedgerError::from(e)
        })
    }
}

fn load_json<T: serde::de::DeserializeOwned>(
    store: &impl KeyValueStore,
    key: &str,
) -> Result<Option<T>, LedgerError> {
    match store.load(key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| LedgerError::CorruptStore {
                key: key.to_string(),
                source,
            }),
    }
}

fn mint_id(existing: &[Bill], ids: &mut impl IdGenerator) -> Result<BillId, LedgerError> {
    let mut last = None;
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = ids.next_id();
        if existing.iter().all(|b| b.id != id) {
            return Ok(id);
        }
        last = Some(id);
    }
    match last {
        Some(id) => Err(LedgerError::DuplicateId { id }),
        None => Ok(ids.next_id()),
    }
}

fn accept(candidate: &BillCandidate, previous: MeterReadings) -> Result<NewBill, LedgerError> {
    let issues = validate(candidate, previous);
    match candidate.to_new_bill() {
        Some(new_bill) if issues.is_empty() => Ok(new_bill),
        _ => {
            warn!(issues = issues.len(), "Bill rejected");
            Err(LedgerError::Validation(issues))
        }
    }
}

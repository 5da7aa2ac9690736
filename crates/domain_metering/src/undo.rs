//! Bounded undo history for ledger mutations
//!
//! Every reversible operation is recorded as a [`LedgerCommand`] memento that
//! knows how to apply and revert itself against the bill collection. The
//! history keeps at most `depth` commands, evicting the oldest first.
//!
//! Only the most recent command is offered for undo, and only until its
//! window closes or another mutation supersedes it. The timer itself is the
//! caller's business: the history just compares against the supplied `now`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use core_kernel::BillId;

use crate::bill::Bill;

/// Default number of commands kept
pub const DEFAULT_UNDO_DEPTH: usize = 10;

/// Default lifetime of an undo offer, in seconds
pub const DEFAULT_UNDO_WINDOW_SECS: i64 = 10;

/// Undo sizing and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoConfig {
    pub depth: usize,
    pub window: Duration,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_UNDO_DEPTH,
            window: Duration::seconds(DEFAULT_UNDO_WINDOW_SECS),
        }
    }
}

/// Kind of a recorded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Delete,
}

/// A reversible change to the bill collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    /// `bill` was removed from position `index`
    Delete { bill: Bill, index: usize },
}

impl LedgerCommand {
    pub fn kind(&self) -> OperationKind {
        match self {
            LedgerCommand::Delete { .. } => OperationKind::Delete,
        }
    }

    /// Id of the bill the command touched
    pub fn affected(&self) -> BillId {
        match self {
            LedgerCommand::Delete { bill, .. } => bill.id,
        }
    }

    /// Performs the command against `bills`
    pub fn apply(&self, bills: &mut Vec<Bill>) {
        match self {
            LedgerCommand::Delete { bill, .. } => bills.retain(|b| b.id != bill.id),
        }
    }

    /// Reverses the command; a deleted bill returns to its former position
    pub fn revert(&self, bills: &mut Vec<Bill>) {
        match self {
            LedgerCommand::Delete { bill, index } => {
                let at = (*index).min(bills.len());
                bills.insert(at, *bill);
            }
        }
    }
}

/// Token identifying one undo offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UndoToken(pub u64);

/// What the caller may present to the user after a reversible operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoOffer {
    pub token: UndoToken,
    pub kind: OperationKind,
    pub bill: Bill,
    pub expires_at: DateTime<Utc>,
}

/// Why an undo request could not be honoured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoRejection {
    /// No offer is pending, or the token belongs to a superseded offer
    NoPending,
    /// The offer's window has closed
    Expired,
}

#[derive(Debug, Clone)]
struct PendingOffer {
    token: UndoToken,
    expires_at: DateTime<Utc>,
}

/// Bounded stack of reversible commands plus the single pending offer
#[derive(Debug, Clone)]
pub struct UndoHistory {
    config: UndoConfig,
    commands: VecDeque<LedgerCommand>,
    pending: Option<PendingOffer>,
    next_token: u64,
}

impl UndoHistory {
    pub fn new(config: UndoConfig) -> Self {
        Self {
            config,
            commands: VecDeque::with_capacity(config.depth),
            pending: None,
            next_token: 1,
        }
    }

    /// Records `command` and makes it the pending offer
    pub fn record(&mut self, command: LedgerCommand, now: DateTime<Utc>) -> UndoOffer {
        if self.config.depth == 0 {
            self.commands.clear();
        } else {
            while self.commands.len() >= self.config.depth {
                self.commands.pop_front();
            }
        }

        let token = UndoToken(self.next_token);
        self.next_token += 1;
        let expires_at = now + self.config.window;

        let LedgerCommand::Delete { bill, .. } = &command;
        let offer = UndoOffer {
            token,
            kind: command.kind(),
            bill: *bill,
            expires_at,
        };

        if self.config.depth > 0 {
            self.commands.push_back(command);
            self.pending = Some(PendingOffer { token, expires_at });
        }
        offer
    }

    /// Withdraws the pending offer; recorded commands stay in the history
    pub fn supersede(&mut self) {
        self.pending = None;
    }

    /// Removes and returns the command behind `token` if it is still on offer
    pub fn take(&mut self, token: UndoToken, now: DateTime<Utc>) -> Result<LedgerCommand, UndoRejection> {
        let pending = self.pending.take().ok_or(UndoRejection::NoPending)?;
        if pending.token != token {
            self.pending = Some(pending);
            return Err(UndoRejection::NoPending);
        }
        if now >= pending.expires_at {
            return Err(UndoRejection::Expired);
        }
        self.commands.pop_back().ok_or(UndoRejection::NoPending)
    }

    /// Token of the pending offer, if any and not yet expired
    pub fn pending_token(&self, now: DateTime<Utc>) -> Option<UndoToken> {
        self.pending
            .as_ref()
            .filter(|p| now < p.expires_at)
            .map(|p| p.token)
    }

    /// Recorded commands, oldest first
    pub fn commands(&self) -> impl Iterator<Item = &LedgerCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Forgets all commands and any pending offer
    pub fn clear(&mut self) {
        self.commands.clear();
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use core_kernel::{Kwh, Money};
    use rust_decimal_macros::dec;

    use crate::bill::NewBill;

    fn bill(day: u32) -> Bill {
        NewBill::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            Money::new(dec!(100)),
            Kwh::new(dec!(100)),
            Kwh::new(dec!(10)),
            Kwh::new(dec!(10)),
        )
        .with_id(BillId::new())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_depth_evicts_oldest() {
        let mut history = UndoHistory::new(UndoConfig {
            depth: 2,
            window: Duration::seconds(10),
        });
        let bills: Vec<_> = (1..=3).map(bill).collect();
        for (i, b) in bills.iter().enumerate() {
            history.record(LedgerCommand::Delete { bill: *b, index: i }, t0());
        }

        let kept: Vec<_> = history.commands().map(LedgerCommand::affected).collect();
        assert_eq!(kept, vec![bills[1].id, bills[2].id]);
    }

    #[test]
    fn test_offer_expires() {
        let mut history = UndoHistory::new(UndoConfig::default());
        let offer = history.record(LedgerCommand::Delete { bill: bill(1), index: 0 }, t0());

        let result = history.take(offer.token, t0() + Duration::seconds(10));
        assert_eq!(result, Err(UndoRejection::Expired));
        // An expired offer is gone for good
        assert_eq!(history.take(offer.token, t0()), Err(UndoRejection::NoPending));
    }

    #[test]
    fn test_superseded_offer_is_rejected() {
        let mut history = UndoHistory::new(UndoConfig::default());
        let offer = history.record(LedgerCommand::Delete { bill: bill(1), index: 0 }, t0());
        history.supersede();

        assert_eq!(history.take(offer.token, t0()), Err(UndoRejection::NoPending));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_stale_token_keeps_current_offer() {
        let mut history = UndoHistory::new(UndoConfig::default());
        let first = history.record(LedgerCommand::Delete { bill: bill(1), index: 0 }, t0());
        let second = history.record(LedgerCommand::Delete { bill: bill(2), index: 0 }, t0());

        assert_eq!(history.take(first.token, t0()), Err(UndoRejection::NoPending));
        assert!(history.take(second.token, t0()).is_ok());
    }

    #[test]
    fn test_revert_restores_position() {
        let mut bills: Vec<_> = (1..=3).map(bill).collect();
        let before = bills.clone();
        let command = LedgerCommand::Delete { bill: bills[1], index: 1 };

        command.apply(&mut bills);
        assert_eq!(bills.len(), 2);

        command.revert(&mut bills);
        assert_eq!(bills, before);
    }
}

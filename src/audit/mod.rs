//! Strict replay of a lifecycle log.
//!
//! Every row must be legal at the moment it appears: unique ids, references
//! to existing deposits of the same client, and only the transitions
//! `Ok -> Disputed -> {Resolved, ChargedBack}`. A locked account takes no new
//! deposits or withdrawals; disputes, resolves and chargebacks still apply.
//! Withdrawals are not checked against available funds.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::csv::{read_snapshots, read_transactions};
use crate::model::{Snapshot, TxKind};
use crate::oracle::Balances;
use crate::{Amount, ClientId, Transaction, TxId};

mod error;
pub use error::{AuditError, CheckError};

/// Lifecycle state of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepositState {
    /// Deposit is valid and can be disputed.
    #[default]
    Ok,
    /// Deposit is currently under dispute.
    Disputed,
    Resolved,
    ChargedBack,
}

#[derive(Debug, Clone)]
struct DepositRecord {
    client: ClientId,
    amount: Amount,
    state: DepositState,
}

/// Replays transactions, tracking balances per client.
#[derive(Debug, Default)]
pub struct Audit {
    clients: BTreeMap<ClientId, Balances>,
    deposits: HashMap<TxId, DepositRecord>,
    withdrawal_ids: HashSet<TxId>,
}

/// Outcome of a successful [`check_log`].
#[derive(Debug)]
pub struct Report {
    pub rows: u64,
    pub snapshots: Vec<Snapshot>,
}

/// Public API
impl Audit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a single row on top of the current state
    pub fn apply(&mut self, tx: &Transaction) -> Result<(), AuditError> {
        let kind = tx.kind();
        match *tx {
            Transaction::Deposit { client, tx, amount } => self.apply_deposit(client, tx, amount),
            Transaction::Withdrawal { client, tx, amount } => {
                self.apply_withdrawal(client, tx, amount)
            }
            Transaction::Dispute { client, tx } => {
                self.transition(kind, client, tx, DepositState::Ok, DepositState::Disputed)
            }
            Transaction::Resolve { client, tx } => {
                self.transition(kind, client, tx, DepositState::Disputed, DepositState::Resolved)
            }
            Transaction::Chargeback { client, tx } => self.transition(
                kind,
                client,
                tx,
                DepositState::Disputed,
                DepositState::ChargedBack,
            ),
        }
    }

    /// Balances of every client seen so far, ordered by client id.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.clients
            .iter()
            .map(|(client, balances)| balances.snapshot(*client))
            .collect()
    }

    pub fn get_client(&self, client: ClientId) -> Option<Balances> {
        self.clients.get(&client).copied()
    }

    /// State of a known deposit.
    pub fn deposit_state(&self, tx: TxId) -> Option<DepositState> {
        self.deposits.get(&tx).map(|record| record.state)
    }
}

/// Private API
impl Audit {
    fn is_unique(&self, tx: &TxId) -> bool {
        !self.deposits.contains_key(tx) && !self.withdrawal_ids.contains(tx)
    }

    fn is_locked(&self, client: &ClientId) -> bool {
        self.clients.get(client).is_some_and(|b| b.locked)
    }

    fn apply_deposit(&mut self, client: ClientId, tx: TxId, amount: Amount) -> Result<(), AuditError> {
        if self.is_locked(&client) {
            return Err(AuditError::AccountLocked(TxKind::Deposit, client));
        }
        if !self.is_unique(&tx) {
            return Err(AuditError::DuplicateTxId(tx));
        }
        if !amount.is_positive() {
            return Err(AuditError::NonPositiveAmount(TxKind::Deposit, tx));
        }

        let balances = self.clients.entry(client).or_default();
        *balances = balances.credit(amount);
        self.deposits.insert(
            tx,
            DepositRecord {
                client,
                amount,
                state: DepositState::Ok,
            },
        );
        Ok(())
    }

    fn apply_withdrawal(
        &mut self,
        client: ClientId,
        tx: TxId,
        amount: Amount,
    ) -> Result<(), AuditError> {
        if self.is_locked(&client) {
            return Err(AuditError::AccountLocked(TxKind::Withdrawal, client));
        }
        if !self.is_unique(&tx) {
            return Err(AuditError::DuplicateTxId(tx));
        }
        if !amount.is_positive() {
            return Err(AuditError::NonPositiveAmount(TxKind::Withdrawal, tx));
        }

        let balances = self.clients.entry(client).or_default();
        *balances = balances.debit(amount);
        self.withdrawal_ids.insert(tx);
        Ok(())
    }

    /// Move a deposit from `from` to `to` and apply the matching balance change.
    fn transition(
        &mut self,
        kind: TxKind,
        client: ClientId,
        tx: TxId,
        from: DepositState,
        to: DepositState,
    ) -> Result<(), AuditError> {
        let record = self
            .deposits
            .get_mut(&tx)
            .ok_or(AuditError::TxNotFound(kind, tx))?;

        if record.client != client {
            return Err(AuditError::ClientMismatch(kind, tx, record.client, client));
        }
        if record.state != from {
            return Err(AuditError::InvalidState(kind, tx, record.state));
        }

        record.state = to;
        let amount = record.amount;
        let balances = self
            .clients
            .get_mut(&client)
            .ok_or(AuditError::TxNotFound(kind, tx))?;

        *balances = match to {
            DepositState::Disputed => balances.hold(amount),
            DepositState::Resolved => balances.release(amount),
            DepositState::ChargedBack => balances.remove_held(amount),
            DepositState::Ok => *balances,
        };
        debug_assert!(balances.is_consistent());
        Ok(())
    }
}

/// Replay the log at `log`, then compare with the snapshot file at `expected` if given.
pub fn check_log(log: impl AsRef<Path>, expected: Option<&Path>) -> Result<Report, CheckError> {
    let mut audit = Audit::new();
    let mut rows = 0;

    for result in read_transactions(log)? {
        let tx = result?;
        rows += 1;
        audit
            .apply(&tx)
            .map_err(|source| CheckError::Rejected { row: rows, tx, source })?;
    }
    debug!(rows, "log replayed");

    let snapshots = audit.snapshots();
    if let Some(path) = expected {
        let expected = read_snapshots(path)?;
        compare(&expected, &snapshots)?;
        info!(path = %path.display(), clients = expected.len(), "snapshot matches");
    }

    Ok(Report { rows, snapshots })
}

fn compare(expected: &[Snapshot], actual: &[Snapshot]) -> Result<(), CheckError> {
    for snapshot in expected {
        let found = actual.iter().find(|s| s.client == snapshot.client).copied();
        if found != Some(*snapshot) {
            return Err(CheckError::SnapshotMismatch {
                client: snapshot.client,
                expected: *snapshot,
                actual: found,
            });
        }
    }
    if expected.len() != actual.len() {
        return Err(CheckError::ClientCount {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    Ok(())
}

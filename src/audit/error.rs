//! Error types for log auditing.

use thiserror::Error;

use crate::csv::CsvError;
use crate::model::{Snapshot, TxKind};
use crate::{ClientId, Transaction, TxId};

use super::DepositState;

/// A single row that breaks the lifecycle rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    #[error("duplicate transaction id {0}")]
    DuplicateTxId(TxId),

    #[error("{0}: account {1} is locked")]
    AccountLocked(TxKind, ClientId),

    #[error("{0}: transaction {1} has a non-positive amount")]
    NonPositiveAmount(TxKind, TxId),

    #[error("{0}: deposit {1} not found")]
    TxNotFound(TxKind, TxId),

    #[error("{0}: deposit {1} belongs to client {2}, not {3}")]
    ClientMismatch(TxKind, TxId, ClientId, ClientId),

    #[error("{0}: deposit {1} is {2:?}")]
    InvalidState(TxKind, TxId, DepositState),
}

/// Failure of a whole log check.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error("row {row} ({tx:?}) rejected: {source}")]
    Rejected {
        row: u64,
        tx: Transaction,
        source: AuditError,
    },

    #[error("client {client}: expected {expected:?}, replay produced {actual:?}")]
    SnapshotMismatch {
        client: ClientId,
        expected: Snapshot,
        actual: Option<Snapshot>,
    },

    #[error("expected {expected} clients, replay produced {actual}")]
    ClientCount { expected: usize, actual: usize },
}

//! Core domain types shared by the generators, the writers and the audit.

use serde::{Deserialize, Serialize};

use crate::Amount;

/// Client identifier.
pub type ClientId = u16;

/// Transaction identifier.
pub type TxId = u32;

/// A row of a transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Credit funds to a client's available balance.
    Deposit {
        client: ClientId,
        tx: TxId,
        amount: Amount,
    },
    /// Debit funds from a client's available balance.
    Withdrawal {
        client: ClientId,
        tx: TxId,
        amount: Amount,
    },
    /// Claim a deposit was erroneous; moves its funds from available to held.
    Dispute { client: ClientId, tx: TxId },
    /// Release disputed funds back to available.
    Resolve { client: ClientId, tx: TxId },
    /// Reverse a disputed deposit; removes held funds and locks the account.
    Chargeback { client: ClientId, tx: TxId },
}

/// The type column of a transaction log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    Deposit,
    Withdrawal,
    Dispute,
    Resolve,
    Chargeback,
}

impl TxKind {
    pub const ALL: [TxKind; 5] = [
        TxKind::Deposit,
        TxKind::Withdrawal,
        TxKind::Dispute,
        TxKind::Resolve,
        TxKind::Chargeback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TxKind::Deposit => "deposit",
            TxKind::Withdrawal => "withdrawal",
            TxKind::Dispute => "dispute",
            TxKind::Resolve => "resolve",
            TxKind::Chargeback => "chargeback",
        }
    }

    pub fn parse(raw: &str) -> Option<TxKind> {
        TxKind::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Transaction {
    pub fn kind(&self) -> TxKind {
        match self {
            Transaction::Deposit { .. } => TxKind::Deposit,
            Transaction::Withdrawal { .. } => TxKind::Withdrawal,
            Transaction::Dispute { .. } => TxKind::Dispute,
            Transaction::Resolve { .. } => TxKind::Resolve,
            Transaction::Chargeback { .. } => TxKind::Chargeback,
        }
    }

    pub fn client(&self) -> ClientId {
        match *self {
            Transaction::Deposit { client, .. }
            | Transaction::Withdrawal { client, .. }
            | Transaction::Dispute { client, .. }
            | Transaction::Resolve { client, .. }
            | Transaction::Chargeback { client, .. } => client,
        }
    }

    pub fn tx(&self) -> TxId {
        match *self {
            Transaction::Deposit { tx, .. }
            | Transaction::Withdrawal { tx, .. }
            | Transaction::Dispute { tx, .. }
            | Transaction::Resolve { tx, .. }
            | Transaction::Chargeback { tx, .. } => tx,
        }
    }

    /// The amount carried by the row, only deposits and withdrawals have one.
    pub fn amount(&self) -> Option<Amount> {
        match *self {
            Transaction::Deposit { amount, .. } | Transaction::Withdrawal { amount, .. } => {
                Some(amount)
            }
            _ => None,
        }
    }
}

/// Expected final balances of one client, as written to the oracle snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub client: ClientId,
    pub available: Amount,
    pub held: Amount,
    pub total: Amount,
    pub locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_its_name() {
        for kind in TxKind::ALL {
            assert_eq!(TxKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TxKind::parse("transfer"), None);
    }

    #[test]
    fn accessors() {
        let deposit = Transaction::Deposit {
            client: 7,
            tx: 42,
            amount: Amount::from_scaled(5),
        };
        assert_eq!(deposit.kind(), TxKind::Deposit);
        assert_eq!(deposit.client(), 7);
        assert_eq!(deposit.tx(), 42);
        assert_eq!(deposit.amount(), Some(Amount::from_scaled(5)));

        let chargeback = Transaction::Chargeback { client: 7, tx: 42 };
        assert_eq!(chargeback.kind(), TxKind::Chargeback);
        assert_eq!(chargeback.amount(), None);
    }
}

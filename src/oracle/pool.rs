use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{Amount, TxId};

/// Which eligible entry a pool hands out next.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Most recently inserted first.
    #[default]
    Lifo,
    /// Oldest first.
    Fifo,
}

/// Transactions currently in one lifecycle state, in insertion order.
#[derive(Debug, Default)]
pub struct Pool {
    entries: VecDeque<(TxId, Amount)>,
    members: HashSet<TxId>,
}

impl Pool {
    /// Add an entry. Returns `false` (and changes nothing) if `tx` is already in the pool.
    pub fn insert(&mut self, tx: TxId, amount: Amount) -> bool {
        if !self.members.insert(tx) {
            return false;
        }
        self.entries.push_back((tx, amount));
        true
    }

    /// Remove and return the next entry according to `selection`.
    pub fn take(&mut self, selection: Selection) -> Option<(TxId, Amount)> {
        let entry = match selection {
            Selection::Lifo => self.entries.pop_back(),
            Selection::Fifo => self.entries.pop_front(),
        }?;
        self.members.remove(&entry.0);
        Some(entry)
    }

    pub fn contains(&self, tx: TxId) -> bool {
        self.members.contains(&tx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all amounts in the pool.
    pub fn sum(&self) -> Amount {
        self.entries.iter().map(|(_, amount)| *amount).sum()
    }
}

/// One pool per lifecycle state.
#[derive(Debug, Default)]
pub struct Pools {
    /// Deposits not yet disputed.
    pub deposited: Pool,
    /// Withdrawals, bookkeeping only.
    pub withdrawn: Pool,
    /// Deposits under dispute.
    pub disputed: Pool,
    pub resolved: Pool,
    pub chargebacked: Pool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Pool {
        let mut pool = Pool::default();
        for tx in 1..=3 {
            assert!(pool.insert(tx, Amount::from_scaled(tx as i64 * 10)));
        }
        pool
    }

    #[test]
    fn lifo_takes_newest() {
        let mut pool = filled();
        assert_eq!(pool.take(Selection::Lifo), Some((3, Amount::from_scaled(30))));
        assert_eq!(pool.take(Selection::Lifo), Some((2, Amount::from_scaled(20))));
        assert!(!pool.contains(3));
        assert!(pool.contains(1));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn fifo_takes_oldest() {
        let mut pool = filled();
        assert_eq!(pool.take(Selection::Fifo), Some((1, Amount::from_scaled(10))));
        assert_eq!(pool.take(Selection::Fifo), Some((2, Amount::from_scaled(20))));
        assert!(!pool.contains(1));
    }

    #[test]
    fn take_from_empty_pool() {
        let mut pool = Pool::default();
        assert!(pool.is_empty());
        assert_eq!(pool.take(Selection::Lifo), None);
        assert_eq!(pool.take(Selection::Fifo), None);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut pool = filled();
        assert!(!pool.insert(2, Amount::from_scaled(999)));
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.sum(), Amount::from_scaled(60));
    }

    #[test]
    fn selection_parses_from_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            selection: Selection,
        }
        let parsed: Wrapper = toml::from_str("selection = \"fifo\"").unwrap();
        assert_eq!(parsed.selection, Selection::Fifo);
        assert_eq!(Selection::default(), Selection::Lifo);
    }
}

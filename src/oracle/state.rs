use crate::model::Snapshot;
use crate::{Amount, ClientId};

/// Derived balances of the simulated account.
///
/// Every transition consumes the current value and returns the next one,
/// keeping `total == available + held`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balances {
    pub available: Amount,
    pub held: Amount,
    pub total: Amount,
    pub locked: bool,
}

impl Balances {
    /// Deposit.
    pub fn credit(mut self, amount: Amount) -> Self {
        self.available += amount;
        self.total += amount;
        self
    }

    /// Withdrawal. May go negative, nothing here enforces funds.
    pub fn debit(mut self, amount: Amount) -> Self {
        self.available -= amount;
        self.total -= amount;
        self
    }

    /// Dispute: available -> held.
    pub fn hold(mut self, amount: Amount) -> Self {
        self.available -= amount;
        self.held += amount;
        self
    }

    /// Resolve: held -> available.
    pub fn release(mut self, amount: Amount) -> Self {
        self.held -= amount;
        self.available += amount;
        self
    }

    /// Chargeback: held funds leave the account, which gets locked.
    pub fn remove_held(mut self, amount: Amount) -> Self {
        self.held -= amount;
        self.total -= amount;
        self.locked = true;
        self
    }

    pub fn is_consistent(&self) -> bool {
        self.available + self.held == self.total
    }

    pub fn snapshot(&self, client: ClientId) -> Snapshot {
        Snapshot {
            client,
            available: self.available,
            held: self.held,
            total: self.total,
            locked: self.locked,
        }
    }
}

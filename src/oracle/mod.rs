//! Lifecycle oracle generator.
//!
//! Simulates a single client through deposit, withdrawal, dispute, resolve
//! and chargeback phases. Every reference row points at a deposit that is in
//! the right state at that moment, and the balances are accumulated alongside,
//! so the expected final snapshot is known without replaying the log.

use rand::Rng;
use tracing::{debug, info};

use crate::config::OracleConfig;
use crate::model::{Snapshot, TxKind};
use crate::rng::FixtureRng;
use crate::{Amount, ClientId, Transaction, TxId};

mod error;
pub use error::OracleError;

mod pool;
pub use pool::{Pool, Pools, Selection};

mod state;
pub use state::Balances;

/// Phases in emission order.
const PHASES: [TxKind; 5] = [
    TxKind::Deposit,
    TxKind::Withdrawal,
    TxKind::Dispute,
    TxKind::Resolve,
    TxKind::Chargeback,
];

/// The oracle, consumed as an iterator of log rows.
///
/// After each yielded row, [`Oracle::balances`] reflects every row emitted so far.
pub struct Oracle {
    client: ClientId,
    selection: Selection,
    deposit_range: (Amount, Amount),
    withdrawal_range: (Amount, Amount),
    counts: [u32; 5],
    first_tx: TxId,
    /// Ids handed out so far; reaches `first_tx + 1` when the whole id space is used.
    issued: u64,
    phase: usize,
    done_in_phase: u32,
    balances: Balances,
    pools: Pools,
    rng: FixtureRng,
}

/// Public API
impl Oracle {
    pub fn new(config: &OracleConfig, rng: FixtureRng) -> Result<Self, OracleError> {
        let deposit_range = config.deposit_amount.bounds()?;
        let withdrawal_range = config.withdrawal_amount.bounds()?;
        let phases = config.phases;

        if phases.dispute > phases.deposit {
            return Err(OracleError::TooManyDisputes {
                disputes: phases.dispute,
                deposits: phases.deposit,
            });
        }
        let settlements = u64::from(phases.resolve) + u64::from(phases.chargeback);
        if settlements > u64::from(phases.dispute) {
            return Err(OracleError::TooManySettlements {
                settlements,
                disputes: phases.dispute,
            });
        }
        // ids count down from first_tx to 0 at most
        let needed = u64::from(phases.deposit) + u64::from(phases.withdrawal);
        let available = u64::from(config.first_tx) + 1;
        if needed > available {
            return Err(OracleError::TxIdSpaceExhausted { needed, available });
        }

        Ok(Self {
            client: config.client,
            selection: config.selection,
            deposit_range,
            withdrawal_range,
            counts: [
                phases.deposit,
                phases.withdrawal,
                phases.dispute,
                phases.resolve,
                phases.chargeback,
            ],
            first_tx: config.first_tx,
            issued: 0,
            phase: 0,
            done_in_phase: 0,
            balances: Balances::default(),
            pools: Pools::default(),
            rng,
        })
    }

    /// Balances after every row emitted so far.
    pub fn balances(&self) -> Balances {
        self.balances
    }

    pub fn pools(&self) -> &Pools {
        &self.pools
    }

    /// Expected final state of the account. Only meaningful once the iterator is drained.
    pub fn snapshot(&self) -> Snapshot {
        self.balances.snapshot(self.client)
    }

    /// Rows still to be emitted.
    pub fn remaining(&self) -> u64 {
        if self.phase >= PHASES.len() {
            return 0;
        }
        let rest: u64 = self.counts[self.phase + 1..]
            .iter()
            .copied()
            .map(u64::from)
            .sum();
        rest + u64::from(self.counts[self.phase] - self.done_in_phase)
    }
}

/// Private API
impl Oracle {
    fn draw(&mut self, (min, max): (Amount, Amount)) -> Amount {
        Amount::from_scaled(self.rng.gen_range(min.scaled()..=max.scaled()))
    }

    /// Hand out the next id, counting down from `first_tx`.
    fn next_tx_id(&mut self) -> TxId {
        // never below zero: `new` checks the plan fits in first_tx + 1 ids
        let id = u64::from(self.first_tx) - self.issued;
        self.issued += 1;
        id as TxId
    }

    /// Move to the first phase that still has rows to emit, logging each boundary.
    /// Returns `None` once every phase is done.
    fn current_phase(&mut self) -> Option<TxKind> {
        while self.phase < PHASES.len() {
            let count = self.counts[self.phase];
            if self.done_in_phase < count {
                let kind = PHASES[self.phase];
                if self.done_in_phase == 0 {
                    info!(phase = %kind, count, "phase started");
                }
                return Some(kind);
            }
            self.phase += 1;
            self.done_in_phase = 0;
        }
        None
    }

    /// Emit one row of `phase`, updating pools and balances together.
    fn step(&mut self, phase: TxKind) -> Result<Transaction, OracleError> {
        let client = self.client;
        let selection = self.selection;

        let tx = match phase {
            TxKind::Deposit => {
                let amount = self.draw(self.deposit_range);
                let tx = self.next_tx_id();
                self.pools.deposited.insert(tx, amount);
                self.balances = self.balances.credit(amount);
                Transaction::Deposit { client, tx, amount }
            }
            TxKind::Withdrawal => {
                let amount = self.draw(self.withdrawal_range);
                let tx = self.next_tx_id();
                self.pools.withdrawn.insert(tx, amount);
                self.balances = self.balances.debit(amount);
                Transaction::Withdrawal { client, tx, amount }
            }
            TxKind::Dispute => {
                let (tx, amount) = self
                    .pools
                    .deposited
                    .take(selection)
                    .ok_or(OracleError::PoolExhausted(phase))?;
                debug_assert!(!self.pools.disputed.contains(tx), "{tx} disputed twice");
                self.pools.disputed.insert(tx, amount);
                self.balances = self.balances.hold(amount);
                Transaction::Dispute { client, tx }
            }
            TxKind::Resolve => {
                let (tx, amount) = self
                    .pools
                    .disputed
                    .take(selection)
                    .ok_or(OracleError::PoolExhausted(phase))?;
                self.pools.resolved.insert(tx, amount);
                self.balances = self.balances.release(amount);
                Transaction::Resolve { client, tx }
            }
            TxKind::Chargeback => {
                let (tx, amount) = self
                    .pools
                    .disputed
                    .take(selection)
                    .ok_or(OracleError::PoolExhausted(phase))?;
                self.pools.chargebacked.insert(tx, amount);
                self.balances = self.balances.remove_held(amount);
                Transaction::Chargeback { client, tx }
            }
        };

        debug_assert!(self.balances.is_consistent());
        debug!(client, tx = tx.tx(), "{phase} generated");
        Ok(tx)
    }
}

impl Iterator for Oracle {
    type Item = Result<Transaction, OracleError>;

    fn next(&mut self) -> Option<Self::Item> {
        let phase = self.current_phase()?;
        let result = self.step(phase);
        match result {
            Ok(_) => self.done_in_phase += 1,
            // stop after the first failure
            Err(_) => self.phase = PHASES.len(),
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (0, Some(remaining))
    }
}

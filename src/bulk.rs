//! Bulk workload generator.
//!
//! Five uncorrelated batches of one transaction type each. Deposit and
//! withdrawal ids come from one ascending counter; dispute, chargeback and
//! resolve rows reference random ids that may not exist at all.

use rand::Rng;
use tracing::info;

use crate::config::{BulkConfig, ConfigError};
use crate::model::TxKind;
use crate::rng::FixtureRng;
use crate::{Amount, ClientId, Transaction, TxId};

/// Batches in emission order.
pub const BATCHES: [TxKind; 5] = [
    TxKind::Deposit,
    TxKind::Withdrawal,
    TxKind::Dispute,
    TxKind::Chargeback,
    TxKind::Resolve,
];

pub struct BulkGenerator {
    batch_size: u64,
    client_max: ClientId,
    amount_range: (Amount, Amount),
    reference_tx_max: TxId,
    batch: usize,
    done_in_batch: u64,
    next_tx: TxId,
    rng: FixtureRng,
}

impl BulkGenerator {
    pub fn new(config: &BulkConfig, rng: FixtureRng) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            batch_size: config.batch_size,
            client_max: config.client_max,
            amount_range: config.amount.bounds()?,
            reference_tx_max: config.reference_tx_max,
            batch: 0,
            done_in_batch: 0,
            next_tx: 0,
            rng,
        })
    }

    /// Rows still to be emitted.
    pub fn remaining(&self) -> u64 {
        let batches_left = BATCHES.len().saturating_sub(self.batch) as u64;
        (batches_left * self.batch_size).saturating_sub(self.done_in_batch)
    }

    fn client(&mut self) -> ClientId {
        self.rng.gen_range(0..=self.client_max)
    }

    fn amount(&mut self) -> Amount {
        let (min, max) = self.amount_range;
        Amount::from_scaled(self.rng.gen_range(min.scaled()..=max.scaled()))
    }

    fn sequential_tx(&mut self) -> TxId {
        let tx = self.next_tx;
        self.next_tx = self.next_tx.wrapping_add(1);
        tx
    }

    fn random_tx(&mut self) -> TxId {
        self.rng.gen_range(0..=self.reference_tx_max)
    }

    fn row(&mut self, kind: TxKind) -> Transaction {
        let client = self.client();
        match kind {
            TxKind::Deposit => Transaction::Deposit {
                client,
                tx: self.sequential_tx(),
                amount: self.amount(),
            },
            TxKind::Withdrawal => Transaction::Withdrawal {
                client,
                tx: self.sequential_tx(),
                amount: self.amount(),
            },
            TxKind::Dispute => Transaction::Dispute {
                client,
                tx: self.random_tx(),
            },
            TxKind::Chargeback => Transaction::Chargeback {
                client,
                tx: self.random_tx(),
            },
            TxKind::Resolve => Transaction::Resolve {
                client,
                tx: self.random_tx(),
            },
        }
    }
}

impl Iterator for BulkGenerator {
    type Item = Transaction;

    fn next(&mut self) -> Option<Self::Item> {
        while self.done_in_batch >= self.batch_size {
            self.batch += 1;
            self.done_in_batch = 0;
            if self.batch >= BATCHES.len() {
                return None;
            }
        }
        let kind = *BATCHES.get(self.batch)?;
        if self.done_in_batch == 0 {
            info!(batch = %kind, rows = self.batch_size, "batch started");
        }
        self.done_in_batch += 1;
        Some(self.row(kind))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng;

    fn small(batch_size: u64) -> BulkConfig {
        BulkConfig {
            batch_size,
            ..BulkConfig::default()
        }
    }

    #[test]
    fn ten_per_batch_in_order() {
        let rows: Vec<_> = BulkGenerator::new(&small(10), rng::from_seed(1))
            .unwrap()
            .collect();
        assert_eq!(rows.len(), 50);

        for (chunk, kind) in rows.chunks(10).zip(BATCHES) {
            assert!(chunk.iter().all(|tx| tx.kind() == kind), "{kind}: {chunk:?}");
        }
    }

    #[test]
    fn deposit_and_withdrawal_ids_are_sequential() {
        let rows: Vec<_> = BulkGenerator::new(&small(4), rng::from_seed(2))
            .unwrap()
            .take(8)
            .collect();
        let ids: Vec<_> = rows.iter().map(Transaction::tx).collect();
        assert_eq!(ids, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn draws_stay_in_range() {
        let config = BulkConfig {
            batch_size: 200,
            client_max: 3,
            amount: crate::config::AmountRange::new(1.0, 2.0),
            reference_tx_max: 5,
        };
        for tx in BulkGenerator::new(&config, rng::from_seed(3)).unwrap() {
            assert!(tx.client() <= 3);
            match tx.amount() {
                Some(amount) => {
                    assert!(amount >= Amount::from_scaled(10_000));
                    assert!(amount <= Amount::from_scaled(20_000));
                }
                None => assert!(tx.tx() <= 5),
            }
        }
    }

    #[test]
    fn size_hint_counts_down() {
        let mut generator = BulkGenerator::new(&small(3), rng::from_seed(4)).unwrap();
        assert_eq!(generator.size_hint(), (15, Some(15)));
        generator.next();
        assert_eq!(generator.remaining(), 14);
        let rest = generator.by_ref().count();
        assert_eq!(rest, 14);
        assert_eq!(generator.remaining(), 0);
        assert!(generator.next().is_none());
    }

    #[test]
    fn empty_batches() {
        let mut generator = BulkGenerator::new(&small(0), rng::from_seed(5)).unwrap();
        assert_eq!(generator.next(), None);
    }

    #[test]
    fn same_seed_same_rows() {
        let a: Vec<_> = BulkGenerator::new(&small(20), rng::from_seed(6)).unwrap().collect();
        let b: Vec<_> = BulkGenerator::new(&small(20), rng::from_seed(6)).unwrap().collect();
        assert_eq!(a, b);
    }
}

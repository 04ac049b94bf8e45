//! Generator configuration.
//!
//! Every knob has a default equal to the reference workload, so an empty
//! TOML file (or none at all) reproduces the standard fixtures.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oracle::Selection;
use crate::{Amount, ClientId, TxId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid amount range {min}..={max}")]
    InvalidRange { min: f64, max: f64 },
    #[error("bulk batch size {0} does not fit the transaction id space")]
    BatchTooLarge(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seed for every random draw; a fresh one is picked when absent.
    pub seed: Option<u64>,
    pub output: OutputConfig,
    pub bulk: BulkConfig,
    pub oracle: OracleConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Truncate an existing destination instead of refusing to touch it.
    pub overwrite: bool,
}

/// Inclusive range of amounts, in currency units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Bounds rounded to 4 decimals. Both must be positive and ordered.
    pub fn bounds(&self) -> Result<(Amount, Amount), ConfigError> {
        let (min, max) = (Amount::from_float(self.min), Amount::from_float(self.max));
        if !min.is_positive() || min > max {
            return Err(ConfigError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok((min, max))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Rows per batch; five batches are written.
    pub batch_size: u64,
    /// Client ids are drawn from `0..=client_max`.
    pub client_max: ClientId,
    pub amount: AmountRange,
    /// Dispute, chargeback and resolve rows reference ids in `0..=reference_tx_max`.
    pub reference_tx_max: TxId,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            batch_size: 10_000_000,
            client_max: ClientId::MAX,
            amount: AmountRange::new(0.0001, 100_000.0),
            reference_tx_max: 10_000_000,
        }
    }
}

impl BulkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.amount.bounds()?;
        // deposits and withdrawals share one ascending counter
        if self.batch_size.saturating_mul(2) > u64::from(TxId::MAX) + 1 {
            return Err(ConfigError::BatchTooLarge(self.batch_size));
        }
        Ok(())
    }
}

/// Number of rows emitted by each oracle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseCounts {
    pub deposit: u32,
    pub withdrawal: u32,
    pub dispute: u32,
    pub resolve: u32,
    pub chargeback: u32,
}

impl Default for PhaseCounts {
    fn default() -> Self {
        Self {
            deposit: 100_000,
            withdrawal: 5_000,
            dispute: 5_000,
            resolve: 2_000,
            chargeback: 2_000,
        }
    }
}

impl PhaseCounts {
    pub fn total(&self) -> u64 {
        [
            self.deposit,
            self.withdrawal,
            self.dispute,
            self.resolve,
            self.chargeback,
        ]
        .into_iter()
        .map(u64::from)
        .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub client: ClientId,
    /// First id handed out; ids count down from here.
    pub first_tx: TxId,
    pub deposit_amount: AmountRange,
    pub withdrawal_amount: AmountRange,
    pub phases: PhaseCounts,
    pub selection: Selection,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            client: ClientId::MAX,
            first_tx: TxId::MAX,
            deposit_amount: AmountRange::new(0.0001, 1.0),
            withdrawal_amount: AmountRange::new(0.0001, 0.5),
            phases: PhaseCounts::default(),
            selection: Selection::default(),
        }
    }
}

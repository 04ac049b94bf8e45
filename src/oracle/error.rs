//! Error types for the lifecycle oracle.

use thiserror::Error;

use crate::config::ConfigError;
use crate::model::TxKind;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{disputes} disputes requested but only {deposits} deposits")]
    TooManyDisputes { disputes: u32, deposits: u32 },

    #[error("{settlements} resolves and chargebacks requested but only {disputes} disputes")]
    TooManySettlements { settlements: u64, disputes: u32 },

    #[error("{needed} transaction ids needed but only {available} are below the first id")]
    TxIdSpaceExhausted { needed: u64, available: u64 },

    #[error("{0} phase found no eligible transaction")]
    PoolExhausted(TxKind),
}

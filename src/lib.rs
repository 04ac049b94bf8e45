pub mod amount;
pub mod audit;
pub mod bulk;
pub mod config;
pub mod csv;
pub mod model;
pub mod oracle;
pub mod pipeline;
pub mod rng;

pub use amount::Amount;
pub use config::Config;
pub use model::{ClientId, Snapshot, Transaction, TxId, TxKind};

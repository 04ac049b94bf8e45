use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ledger_fixtures::Config;
use ledger_fixtures::config::ConfigError;
use ledger_fixtures::oracle::Selection;

#[derive(Parser)]
#[command(
    name = "ledger-fixtures",
    about = "Generate transaction logs and expected balances for ledger engines",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Five uncorrelated batches of deposits, withdrawals, disputes, chargebacks and resolves
    Bulk(BulkArgs),
    /// One client's full lifecycle plus the balances a correct engine must end with
    Oracle(OracleArgs),
    /// Replay a lifecycle log strictly and compare it with an expected snapshot
    Check(CheckArgs),
}

/// Flags shared by the generating commands.
#[derive(Args)]
pub struct CommonArgs {
    /// Transaction log to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// TOML file with generator settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Replace existing files instead of refusing to run
    #[arg(long)]
    pub overwrite: bool,
}

impl CommonArgs {
    /// Settings from the config file (or defaults), with flags applied on top.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.overwrite {
            config.output.overwrite = true;
        }
        Ok(config)
    }
}

#[derive(Args)]
pub struct BulkArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Rows per batch
    #[arg(long)]
    pub batch_size: Option<u64>,
}

#[derive(Args)]
pub struct OracleArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Snapshot file [default: <output>.expected]
    #[arg(short, long)]
    pub expected: Option<PathBuf>,

    #[arg(long)]
    pub deposits: Option<u32>,

    #[arg(long)]
    pub withdrawals: Option<u32>,

    #[arg(long)]
    pub disputes: Option<u32>,

    #[arg(long)]
    pub resolves: Option<u32>,

    #[arg(long)]
    pub chargebacks: Option<u32>,

    /// Which eligible deposit each dispute, resolve and chargeback picks
    #[arg(long, value_enum)]
    pub selection: Option<Selection>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Transaction log to replay
    pub log: PathBuf,

    /// Snapshot file the replay must match
    #[arg(short, long)]
    pub expected: Option<PathBuf>,
}

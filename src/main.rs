use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use ledger_fixtures::audit::check_log;
use ledger_fixtures::pipeline::{generate_bulk, generate_oracle};

mod cli;
use cli::{BulkArgs, CheckArgs, Cli, Command, OracleArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Bulk(args) => bulk(args).await,
        Command::Oracle(args) => oracle(args).await,
        Command::Check(args) => check(args),
    }
}

async fn bulk(args: BulkArgs) -> anyhow::Result<()> {
    let mut config = args.common.load()?;
    if let Some(batch_size) = args.batch_size {
        config.bulk.batch_size = batch_size;
    }

    let summary = generate_bulk(&config, &args.common.output)
        .await
        .with_context(|| format!("bulk generation into {}", args.common.output.display()))?;

    println!(
        "wrote {} rows to {} (seed {})",
        summary.rows,
        args.common.output.display(),
        summary.seed
    );
    Ok(())
}

async fn oracle(args: OracleArgs) -> anyhow::Result<()> {
    let mut config = args.common.load()?;
    let phases = &mut config.oracle.phases;
    for (flag, count) in [
        (args.deposits, &mut phases.deposit),
        (args.withdrawals, &mut phases.withdrawal),
        (args.disputes, &mut phases.dispute),
        (args.resolves, &mut phases.resolve),
        (args.chargebacks, &mut phases.chargeback),
    ] {
        if let Some(value) = flag {
            *count = value;
        }
    }
    if let Some(selection) = args.selection {
        config.oracle.selection = selection;
    }

    let summary = generate_oracle(&config, &args.common.output, args.expected.as_deref())
        .await
        .with_context(|| format!("oracle generation into {}", args.common.output.display()))?;

    let snapshot = summary.snapshot;
    println!(
        "wrote {} rows to {} and snapshot to {} (seed {}): client {} available {} held {} total {} locked {}",
        summary.rows,
        args.common.output.display(),
        summary.expected.display(),
        summary.seed,
        snapshot.client,
        snapshot.available,
        snapshot.held,
        snapshot.total,
        snapshot.locked
    );
    Ok(())
}

fn check(args: CheckArgs) -> anyhow::Result<()> {
    let report = check_log(&args.log, args.expected.as_deref())
        .with_context(|| format!("checking {}", args.log.display()))?;

    let verdict = if args.expected.is_some() {
        "matches expected snapshot"
    } else {
        "is consistent"
    };
    println!(
        "{}: {} rows, {} clients, {verdict}",
        args.log.display(),
        report.rows,
        report.snapshots.len()
    );
    Ok(())
}

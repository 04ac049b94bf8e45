//! Generation runs.
//!
//! A generator runs in its own task and streams rows through a bounded
//! channel to the log writer, so neither workload is ever held in memory as
//! a whole. Row order is generation order.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::bulk::BulkGenerator;
use crate::config::{Config, ConfigError};
use crate::csv::{Dialect, LogWriter, OutputError, open_output, write_snapshots};
use crate::model::Snapshot;
use crate::oracle::{Oracle, OracleError};
use crate::{Transaction, rng};

/// Rows buffered between a generator and the writer.
pub const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("generator task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What a bulk run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSummary {
    pub seed: u64,
    pub rows: u64,
}

/// What an oracle run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleSummary {
    pub seed: u64,
    pub rows: u64,
    pub expected: PathBuf,
    pub snapshot: Snapshot,
}

/// `<log>.expected`, where the snapshot goes unless told otherwise.
pub fn default_expected_path(log: impl AsRef<Path>) -> PathBuf {
    let mut path: OsString = log.as_ref().as_os_str().to_owned();
    path.push(".expected");
    PathBuf::from(path)
}

/// Run `rows` on a separate task, forwarding each row into the returned stream.
///
/// The task stops at the first generator error, or as soon as the stream is
/// dropped, and hands the generator back so its final state can be read.
pub fn spawn_producer<I, E>(mut rows: I) -> (ReceiverStream<Transaction>, JoinHandle<Result<I, E>>)
where
    I: Iterator<Item = Result<Transaction, E>> + Send + 'static,
    E: Send + 'static,
{
    let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);

    let handle = tokio::spawn(async move {
        for row in rows.by_ref() {
            if sender.send(row?).await.is_err() {
                warn!("log writer went away, stopping generation");
                break;
            }
        }
        Ok::<I, E>(rows)
    });

    (ReceiverStream::new(receiver), handle)
}

/// Write every row of `stream`, then flush.
pub async fn write_stream<W: Write>(
    mut stream: impl Stream<Item = Transaction> + Unpin,
    mut writer: LogWriter<W>,
) -> Result<(u64, W), OutputError> {
    while let Some(tx) = stream.next().await {
        writer.write(&tx)?;
    }
    writer.finish()
}

/// Destinations opened by a run. Dropping it before [`Outputs::keep`] removes
/// every file it created, so a failed run leaves no partial fixture behind.
#[derive(Debug)]
struct Outputs {
    overwrite: bool,
    created: Vec<PathBuf>,
}

impl Outputs {
    fn new(overwrite: bool) -> Self {
        Self {
            overwrite,
            created: Vec::new(),
        }
    }

    fn open(&mut self, path: &Path) -> Result<File, OutputError> {
        let file = open_output(path, self.overwrite)?;
        self.created.push(path.to_path_buf());
        Ok(file)
    }

    fn keep(mut self) {
        self.created.clear();
    }
}

impl Drop for Outputs {
    fn drop(&mut self) {
        for path in self.created.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => warn!(path = %path.display(), "removed incomplete output"),
                Err(err) => warn!(path = %path.display(), %err, "failed to remove incomplete output"),
            }
        }
    }
}

/// Generate the bulk workload into `path`.
pub async fn generate_bulk(
    config: &Config,
    path: impl AsRef<Path>,
) -> Result<BulkSummary, GenerateError> {
    let path = path.as_ref();
    let seed = rng::resolve_seed(config.seed);
    let generator = BulkGenerator::new(&config.bulk, rng::from_seed(seed))?;

    let mut outputs = Outputs::new(config.output.overwrite);
    let file = outputs.open(path)?;
    let writer = LogWriter::new(BufWriter::new(file), Dialect::BULK)?;

    let (stream, producer) = spawn_producer(generator.map(Ok::<_, GenerateError>));
    let written = write_stream(stream, writer).await;
    let _ = producer.await??;
    let (rows, mut inner) = written?;
    inner.flush().map_err(OutputError::from)?;
    outputs.keep();

    info!(path = %path.display(), rows, "bulk workload written");
    Ok(BulkSummary { seed, rows })
}

/// Generate the lifecycle log into `log` and its expected snapshot into
/// `expected` (or `<log>.expected`).
pub async fn generate_oracle(
    config: &Config,
    log: impl AsRef<Path>,
    expected: Option<&Path>,
) -> Result<OracleSummary, GenerateError> {
    let log = log.as_ref();
    let expected = expected
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_expected_path(log));

    let seed = rng::resolve_seed(config.seed);
    let oracle = Oracle::new(&config.oracle, rng::from_seed(seed))?;

    // open both destinations before writing anything
    let mut outputs = Outputs::new(config.output.overwrite);
    let log_file = outputs.open(log)?;
    let snapshot_file = outputs.open(&expected)?;
    let writer = LogWriter::new(BufWriter::new(log_file), Dialect::LIFECYCLE)?;

    let (stream, producer) = spawn_producer(oracle);
    let written = write_stream(stream, writer).await;
    let oracle = producer.await??;
    let (rows, mut inner) = written?;
    inner.flush().map_err(OutputError::from)?;

    let snapshot = oracle.snapshot();
    write_snapshot(snapshot_file, &snapshot)?;
    outputs.keep();

    info!(
        log = %log.display(),
        expected = %expected.display(),
        rows,
        available = %snapshot.available,
        held = %snapshot.held,
        total = %snapshot.total,
        locked = snapshot.locked,
        "lifecycle workload written"
    );
    Ok(OracleSummary {
        seed,
        rows,
        expected,
        snapshot,
    })
}

fn write_snapshot(file: File, snapshot: &Snapshot) -> Result<(), OutputError> {
    let mut inner = write_snapshots(BufWriter::new(file), [snapshot])?;
    inner.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::check_log;
    use crate::config::PhaseCounts;
    use tempfile::TempDir;

    fn seeded() -> Config {
        let mut config = Config {
            seed: Some(11),
            ..Config::default()
        };
        config.bulk.batch_size = 10;
        config.oracle.phases = PhaseCounts {
            deposit: 50,
            withdrawal: 5,
            dispute: 10,
            resolve: 3,
            chargeback: 4,
        };
        config
    }

    #[test]
    fn expected_path_appends_suffix() {
        assert_eq!(
            default_expected_path("out/largedisputes.csv"),
            PathBuf::from("out/largedisputes.csv.expected")
        );
    }

    #[tokio::test]
    async fn bulk_run_writes_header_and_batches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bulk.csv");

        let summary = generate_bulk(&seeded(), &path).await.unwrap();
        assert_eq!(summary, BulkSummary { seed: 11, rows: 50 });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 51);
        assert_eq!(lines[0], "type, client, tx, amount");
        assert!(lines[1..11].iter().all(|l| l.starts_with("deposit,")));
        assert!(lines[21..31].iter().all(|l| l.starts_with("dispute,") && l.ends_with(",0")));
        assert!(lines[31..41].iter().all(|l| l.starts_with("chargeback,") && l.ends_with(',')));
        assert!(lines[41..].iter().all(|l| l.starts_with("resolve,") && l.ends_with(",0.000")));
    }

    #[tokio::test]
    async fn oracle_run_passes_audit() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("disputes.csv");

        let summary = generate_oracle(&seeded(), &log, None).await.unwrap();
        assert_eq!(summary.rows, 72);
        assert_eq!(summary.expected, default_expected_path(&log));
        assert!(summary.snapshot.locked);

        let report = check_log(&log, Some(summary.expected.as_path())).unwrap();
        assert_eq!(report.rows, 72);
        assert_eq!(report.snapshots, vec![summary.snapshot]);
    }

    #[tokio::test]
    async fn existing_output_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bulk.csv");
        std::fs::write(&path, "keep me\n").unwrap();

        let err = generate_bulk(&seeded(), &path).await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Output(OutputError::AlreadyExists(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me\n");
    }

    #[tokio::test]
    async fn overwrite_replaces_and_reproduces() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("disputes.csv");
        let mut config = seeded();
        config.output.overwrite = true;

        generate_oracle(&config, &log, None).await.unwrap();
        let first = std::fs::read_to_string(&log).unwrap();
        generate_oracle(&config, &log, None).await.unwrap();
        let second = std::fs::read_to_string(&log).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.matches("type, client, tx, amount").count(), 1);
    }

    #[tokio::test]
    async fn invalid_plan_fails_before_touching_disk() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("disputes.csv");
        let mut config = seeded();
        config.oracle.phases.dispute = 1_000;

        let err = generate_oracle(&config, &log, None).await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Oracle(OracleError::TooManyDisputes { .. })
        ));
        assert!(!log.exists());
    }

    #[tokio::test]
    async fn existing_snapshot_leaves_no_log_behind() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("disputes.csv");
        let expected = default_expected_path(&log);
        std::fs::write(&expected, "keep me\n").unwrap();

        let err = generate_oracle(&seeded(), &log, None).await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Output(OutputError::AlreadyExists(ref path)) if *path == expected
        ));
        assert!(!log.exists());
        assert_eq!(std::fs::read_to_string(&expected).unwrap(), "keep me\n");

        // nothing stale blocks the next run
        std::fs::remove_file(&expected).unwrap();
        let summary = generate_oracle(&seeded(), &log, None).await.unwrap();
        assert_eq!(summary.rows, 72);
    }

    #[test]
    fn dropped_outputs_are_removed_unless_kept() {
        let dir = TempDir::new().unwrap();
        let partial = dir.path().join("partial.csv");
        let complete = dir.path().join("complete.csv");

        let mut outputs = Outputs::new(false);
        outputs.open(&partial).unwrap().write_all(b"type").unwrap();
        drop(outputs);
        assert!(!partial.exists());

        let mut outputs = Outputs::new(false);
        outputs.open(&complete).unwrap().write_all(b"type").unwrap();
        outputs.keep();
        assert_eq!(std::fs::read_to_string(&complete).unwrap(), "type");
    }

    #[tokio::test]
    async fn producer_stops_on_generator_error() {
        let rows = vec![
            Ok(Transaction::Dispute { client: 1, tx: 1 }),
            Err("boom"),
            Ok(Transaction::Dispute { client: 1, tx: 2 }),
        ];
        let (stream, producer) = spawn_producer(rows.into_iter());
        let collected: Vec<_> = stream.collect().await;

        assert_eq!(collected, vec![Transaction::Dispute { client: 1, tx: 1 }]);
        assert!(matches!(producer.await.unwrap(), Err("boom")));
    }
}

use serde::{Deserialize, Serialize, Serializer};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::amount::AmountError;
use crate::model::{Snapshot, TxKind};
use crate::{Amount, ClientId, Transaction, TxId};

/// Header of every transaction log. The spaces are part of the fixture.
pub const LOG_HEADER: [&str; 4] = ["type", " client", " tx", " amount"];

/// Errors that can occur when writing fixtures
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("{0} already exists, refusing to overwrite it")]
    AlreadyExists(PathBuf),

    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to write row: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush output: {0}")]
    Flush(#[from] io::Error),
}

/// Errors that can occur when parsing csv rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized transaction type '{tx_type}'")]
    UnrecognizedType { line: usize, tx_type: String },

    #[error("line {line}: {tx_type} missing amount")]
    MissingAmount { line: usize, tx_type: TxKind },

    #[error("line {line}: {source}")]
    InvalidAmount { line: usize, source: AmountError },
}

/// Open a fixture destination. Never appends: either truncates (`overwrite`)
/// or creates the file exclusively.
pub fn open_output(path: impl AsRef<Path>, overwrite: bool) -> Result<File, OutputError> {
    let path = path.as_ref();
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let file = options.open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::AlreadyExists {
            OutputError::AlreadyExists(path.to_path_buf())
        } else {
            OutputError::Open {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    debug!(path = %path.display(), overwrite, "opened output");
    Ok(file)
}

/// What goes in the amount column of a row that carries no amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `dispute,1,2,`
    Empty,
    /// `dispute,1,2,0`
    Zero,
    /// `resolve,1,2,0.000`
    ZeroPadded,
}

impl Placeholder {
    pub fn as_str(self) -> &'static str {
        match self {
            Placeholder::Empty => "",
            Placeholder::Zero => "0",
            Placeholder::ZeroPadded => "0.000",
        }
    }
}

/// Amount column conventions of a log. Downstream parsers are tested
/// against these exact forms, so each generator keeps its own.
///
/// Only the placeholders vary. Deposit and withdrawal amounts are always
/// written with four fraction digits (`0.5000`, never `0.5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub dispute: Placeholder,
    pub resolve: Placeholder,
    pub chargeback: Placeholder,
}

impl Dialect {
    /// Uncorrelated bulk batches.
    pub const BULK: Dialect = Dialect {
        dispute: Placeholder::Zero,
        resolve: Placeholder::ZeroPadded,
        chargeback: Placeholder::Empty,
    };

    /// Lifecycle oracle logs.
    pub const LIFECYCLE: Dialect = Dialect {
        dispute: Placeholder::Empty,
        resolve: Placeholder::ZeroPadded,
        chargeback: Placeholder::Empty,
    };

    fn cell(&self, tx: &Transaction) -> AmountCell {
        match tx {
            Transaction::Deposit { amount, .. } | Transaction::Withdrawal { amount, .. } => {
                AmountCell::Value(*amount)
            }
            Transaction::Dispute { .. } => AmountCell::Placeholder(self.dispute),
            Transaction::Resolve { .. } => AmountCell::Placeholder(self.resolve),
            Transaction::Chargeback { .. } => AmountCell::Placeholder(self.chargeback),
        }
    }
}

enum AmountCell {
    Value(Amount),
    Placeholder(Placeholder),
}

impl Serialize for AmountCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AmountCell::Value(amount) => serializer.collect_str(amount),
            AmountCell::Placeholder(p) => serializer.serialize_str(p.as_str()),
        }
    }
}

#[derive(Serialize)]
struct LogRow {
    r#type: &'static str,
    client: ClientId,
    tx: TxId,
    amount: AmountCell,
}

/// Writes a transaction log: header line first, then one row per transaction.
pub struct LogWriter<W: Write> {
    writer: csv::Writer<W>,
    dialect: Dialect,
    rows: u64,
}

impl<W: Write> LogWriter<W> {
    pub fn new(inner: W, dialect: Dialect) -> Result<Self, OutputError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(inner);
        writer.write_record(LOG_HEADER)?;

        Ok(Self {
            writer,
            dialect,
            rows: 0,
        })
    }

    pub fn write(&mut self, tx: &Transaction) -> Result<(), OutputError> {
        let row = LogRow {
            r#type: tx.kind().as_str(),
            client: tx.client(),
            tx: tx.tx(),
            amount: self.dialect.cell(tx),
        };
        self.writer.serialize(&row)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<(u64, W), OutputError> {
        let rows = self.rows;
        let inner = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::Flush(e.into_error()))?;
        Ok((rows, inner))
    }
}

/// Write snapshot rows with their `client,available,held,total,locked` header
pub fn write_snapshots<'a, W: Write>(
    inner: W,
    snapshots: impl IntoIterator<Item = &'a Snapshot>,
) -> Result<W, OutputError> {
    let mut writer = csv::Writer::from_writer(inner);
    for snapshot in snapshots {
        writer.serialize(snapshot)?;
    }
    writer.into_inner().map_err(|e| OutputError::Flush(e.into_error()))
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    client: ClientId,
    tx: TxId,
    amount: Option<String>,
}

/// Read transactions from a csv file
pub fn read_transactions(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Transaction, CsvError>>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            parse_row(line, row)
        }))
}

fn parse_row(line: usize, row: InputRow) -> Result<Transaction, CsvError> {
    let kind = TxKind::parse(&row.r#type).ok_or_else(|| CsvError::UnrecognizedType {
        line,
        tx_type: row.r#type.clone(),
    })?;
    let (client, tx) = (row.client, row.tx);

    let amount = || -> Result<Amount, CsvError> {
        let raw = row
            .amount
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .ok_or(CsvError::MissingAmount {
                line,
                tx_type: kind,
            })?;
        raw.parse()
            .map_err(|source| CsvError::InvalidAmount { line, source })
    };

    Ok(match kind {
        TxKind::Deposit => Transaction::Deposit {
            client,
            tx,
            amount: amount()?,
        },
        TxKind::Withdrawal => Transaction::Withdrawal {
            client,
            tx,
            amount: amount()?,
        },
        // whatever sits in the amount column of these rows is ignored
        TxKind::Dispute => Transaction::Dispute { client, tx },
        TxKind::Resolve => Transaction::Resolve { client, tx },
        TxKind::Chargeback => Transaction::Chargeback { client, tx },
    })
}

/// Read every row of a snapshot file
pub fn read_snapshots(path: impl AsRef<Path>) -> Result<Vec<Snapshot>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    reader
        .into_deserialize::<Snapshot>()
        .enumerate()
        .map(|(idx, result)| result.map_err(|source| CsvError::Parse { line: idx + 2, source }))
        .collect()
}

//! Reader for the marketplace event export.
//!
//! Only the columns the pipeline needs are read: timestamp (1), event (2),
//! project id (3), JSON props (14) and JSON nums (15).

use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::models::transaction::{Transaction, TransactionNums, TransactionProps};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const COL_TIMESTAMP: usize = 1;
const COL_EVENT: usize = 2;
const COL_PROJECT_ID: usize = 3;
const COL_PROPS: usize = 14;
const COL_NUMS: usize = 15;

#[derive(Debug, thiserror::Error)]
pub enum CsvReadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV parse error at row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("row {row}: {message}")]
    Row { row: usize, message: String },
}

pub fn read_transactions_file(path: &Path) -> Result<Vec<Transaction>, CsvReadError> {
    let file = File::open(path).map_err(|source| CsvReadError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let transactions = read_transactions(file)?;

    tracing::info!("Read {} transactions from {}", transactions.len(), path.display());

    Ok(transactions)
}

/// Parse every data row; the header row is skipped and rows may vary in width.
pub fn read_transactions<R: Read>(reader: R) -> Result<Vec<Transaction>, CsvReadError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut transactions = Vec::new();

    for (i, result) in csv.records().enumerate() {
        let row = i + 1;
        let record = result.map_err(|source| CsvReadError::Csv { row, source })?;
        let txn = parse_record(&record).map_err(|message| CsvReadError::Row { row, message })?;
        transactions.push(txn);
    }

    Ok(transactions)
}

pub fn parse_record(record: &csv::StringRecord) -> Result<Transaction, String> {
    let field = |index: usize, name: &str| {
        record
            .get(index)
            .ok_or_else(|| format!("missing {} column ({} columns present)", name, record.len()))
    };

    let raw_timestamp = field(COL_TIMESTAMP, "timestamp")?;
    let timestamp = NaiveDateTime::parse_from_str(raw_timestamp.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid timestamp '{}': {}", raw_timestamp, e))?
        .and_utc();

    let props: TransactionProps = serde_json::from_str(field(COL_PROPS, "props")?)
        .map_err(|e| format!("invalid props JSON: {}", e))?;
    let nums: TransactionNums = serde_json::from_str(field(COL_NUMS, "nums")?)
        .map_err(|e| format!("invalid nums JSON: {}", e))?;

    Ok(Transaction {
        timestamp,
        event: field(COL_EVENT, "event")?.to_string(),
        project_id: field(COL_PROJECT_ID, "project_id")?.to_string(),
        props,
        nums,
    })
}

/// Distinct raw tickers, sorted
pub fn unique_tickers(transactions: &[Transaction]) -> BTreeSet<String> {
    transactions
        .iter()
        .map(|txn| txn.ticker().to_string())
        .collect()
}

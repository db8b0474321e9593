// 📥 CSV Import - pending statements from a bank export
//
// Expected columns (header row required):
//   date,amount,description[,committed]
// Dates are YYYY-MM-DD, amounts plain decimals with at most two digits after
// the point.

use crate::error::LedgerResult;
use crate::listing::{CommittableListing, HandleRange};
use crate::money::Money;
use crate::statement::CommittableStatement;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// One CSV row.
#[derive(Debug, Deserialize)]
pub struct CsvStatement {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Money,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub committed: bool,
}

impl CsvStatement {
    pub fn into_statement(self) -> LedgerResult<CommittableStatement> {
        let mut statement = CommittableStatement::new(self.amount, &self.description, self.date)?;
        statement.set_committed(self.committed);
        Ok(statement)
    }
}

/// Reads validated statements from CSV text.
pub fn read_csv<R: Read>(input: R) -> Result<Vec<CommittableStatement>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(input);

    let mut statements = Vec::new();
    for (index, result) in reader.deserialize::<CsvStatement>().enumerate() {
        // +2: 1-indexed plus the header row
        let line = index + 2;
        let row = result.with_context(|| format!("Failed to parse CSV line {line}"))?;
        let statement = row
            .into_statement()
            .with_context(|| format!("Invalid statement on CSV line {line}"))?;
        statements.push(statement);
    }

    Ok(statements)
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<CommittableStatement>> {
    let file = File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file: {}", csv_path.display()))?;
    let statements = read_csv(file).with_context(|| format!("Failed to import {}", csv_path.display()))?;

    info!(path = %csv_path.display(), statements = statements.len(), "loaded CSV");
    Ok(statements)
}

/// Appends `statements` to the live listing and returns where they landed.
pub fn import_into(
    listing: &mut CommittableListing,
    statements: impl IntoIterator<Item = CommittableStatement>,
) -> HandleRange {
    let start = listing.end();
    for statement in statements {
        listing.add(statement);
    }
    let range = HandleRange::new(start, listing.end());

    info!(listing = %listing.name(), imported = range.len(), "imported statements");
    range
}

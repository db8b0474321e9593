// 🧾 Entry - the atomic (amount, description, date) record
//
// Several entries may be needed to account for a single statement: a $21.00
// withdrawal can be a $20.00 entry plus a $1.00 fee entry.

use crate::date;
use crate::error::{LedgerError, LedgerResult};
use crate::money::{self, Money, AMOUNT_WIDTH};
use crate::reader::split_token;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Immutable once built. The description is trimmed and single-line, the
/// amount has at most two decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    amount: Money,
    description: String,
    date: NaiveDate,
}

impl Entry {
    pub fn new(amount: Money, description: impl AsRef<str>, date: NaiveDate) -> LedgerResult<Self> {
        let amount = money::ensure_cents(amount)?;
        let description = description.as_ref().trim();
        if description.contains(['\n', '\r']) {
            return Err(LedgerError::InvalidDescription {
                description: description.to_string(),
            });
        }

        Ok(Entry {
            amount,
            description: description.to_string(),
            date,
        })
    }

    /// Entry dated today.
    pub fn today(amount: Money, description: impl AsRef<str>) -> LedgerResult<Self> {
        Self::new(amount, description, date::today())
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Reads an entry from one line: date, amount, then the description up to
    /// the end of the line.
    pub fn parse_line(line: &str) -> LedgerResult<Self> {
        let (date_text, rest) =
            split_token(line).ok_or_else(|| LedgerError::parse("Entry", "empty line"))?;
        let date = date::parse_date(date_text)?;

        let (amount_text, description) = split_token(rest)
            .ok_or_else(|| LedgerError::parse("Entry", format!("missing amount in {line:?}")))?;
        let amount = money::parse_amount(amount_text)?;

        Self::new(amount, description, date)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>width$}",
            date::format_date(self.date),
            money::format_amount(self.amount),
            width = AMOUNT_WIDTH
        )?;
        if !self.description.is_empty() {
            write!(f, " {}", self.description)?;
        }
        Ok(())
    }
}

impl FromStr for Entry {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s)
    }
}

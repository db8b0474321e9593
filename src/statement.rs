// 🧮 Statements - one ledger line, simple or composed of several entries
//
// A deposit of three cheques is a single statement in a listing and yet is
// composed of three entries. The composed statement's main entry carries the
// total, the grouping description and the grouping date.

use crate::date;
use crate::entry::Entry;
use crate::error::{LedgerError, LedgerResult};
use crate::money::{self, Money};
use crate::reader::RecordReader;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::io::BufRead;

/// Marks the lines holding the entries of a composed statement.
pub const COMPOSED_MARKER: char = '-';

/// Start of a composed entry line. The trailing space keeps a main entry
/// dated before year 0 (`-0001-01-01`) from reading as a child.
const COMPOSED_PREFIX: &str = "- ";

/// Marks committed statements in a live listing.
pub const COMMITTED_MARKER: char = '#';

// ============================================================================
// STATEMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    main: Entry,
    /// Empty for a simple statement.
    composed: Vec<Entry>,
}

impl Statement {
    pub fn new(amount: Money, description: impl AsRef<str>, date: NaiveDate) -> LedgerResult<Self> {
        Ok(Entry::new(amount, description, date)?.into())
    }

    /// Statement dated today.
    pub fn today(amount: Money, description: impl AsRef<str>) -> LedgerResult<Self> {
        Self::new(amount, description, date::today())
    }

    /// Builds a composed statement whose amount is the sum of `entries`.
    ///
    /// A single entry yields a simple statement made of that entry; the
    /// grouping description and date are then unused.
    pub fn composed(
        description: impl AsRef<str>,
        date: NaiveDate,
        mut entries: Vec<Entry>,
    ) -> LedgerResult<Self> {
        match entries.len() {
            0 => Err(LedgerError::EmptyComposition),
            1 => Ok(entries.remove(0).into()),
            _ => {
                let total = money::sum(entries.iter().map(Entry::amount));
                let main = Entry::new(total, description, date)?;
                Ok(Statement {
                    main,
                    composed: entries,
                })
            }
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.main.date()
    }

    pub fn description(&self) -> &str {
        self.main.description()
    }

    pub fn amount(&self) -> Money {
        self.main.amount()
    }

    /// Single entry view of the statement.
    pub fn main_entry(&self) -> &Entry {
        &self.main
    }

    /// Empty unless the statement is composed.
    pub fn composed_entries(&self) -> &[Entry] {
        &self.composed
    }

    pub fn is_composed(&self) -> bool {
        !self.composed.is_empty()
    }

    /// Number of composed entries, zero for a simple statement.
    pub fn entry_count(&self) -> usize {
        self.composed.len()
    }

    /// The entries this statement contributes when grouped with others: its
    /// children if composed, its main entry otherwise.
    pub fn entries(&self) -> &[Entry] {
        if self.is_composed() {
            &self.composed
        } else {
            std::slice::from_ref(&self.main)
        }
    }

    fn write_lines(&self, f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
        writeln!(f, "{prefix}{}", self.main)?;
        let padding = " ".repeat(prefix.chars().count());
        for entry in &self.composed {
            writeln!(f, "{padding}{COMPOSED_PREFIX}{entry}")?;
        }
        Ok(())
    }

    /// Reads the composed entries following an already read main entry.
    ///
    /// When at least one child is present their amounts must add up to the
    /// main entry's amount exactly.
    pub(crate) fn read_composition<R: BufRead>(
        main: Entry,
        reader: &mut RecordReader<R>,
    ) -> LedgerResult<Self> {
        let mut entries = Vec::new();
        loop {
            let child = match reader.peek_record()? {
                Some(line) => match line.trim_start().strip_prefix(COMPOSED_PREFIX) {
                    Some(rest) => Entry::parse_line(rest)?,
                    None => break,
                },
                None => break,
            };
            reader.next_record()?;
            entries.push(child);
        }

        if entries.is_empty() {
            return Ok(main.into());
        }

        if money::sum(entries.iter().map(Entry::amount)) != main.amount() {
            return Err(LedgerError::AmountMismatch { main, entries });
        }

        Self::composed(main.description(), main.date(), entries)
    }
}

impl From<Entry> for Statement {
    fn from(entry: Entry) -> Self {
        Statement {
            main: entry,
            composed: Vec::new(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_lines(f, "")
    }
}

// ============================================================================
// COMMITTABLE STATEMENT
// ============================================================================

/// A statement with a commit state: pending operations are uncommitted,
/// settled ones are committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittableStatement {
    #[serde(flatten)]
    statement: Statement,
    committed: bool,
}

impl CommittableStatement {
    pub fn new(amount: Money, description: impl AsRef<str>, date: NaiveDate) -> LedgerResult<Self> {
        Ok(Statement::new(amount, description, date)?.into())
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn set_committed(&mut self, committed: bool) {
        self.committed = committed;
    }

    pub fn committed(mut self) -> Self {
        self.committed = true;
        self
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn into_statement(self) -> Statement {
        self.statement
    }

    pub fn date(&self) -> NaiveDate {
        self.statement.date()
    }

    pub fn description(&self) -> &str {
        self.statement.description()
    }

    pub fn amount(&self) -> Money {
        self.statement.amount()
    }

    pub fn main_entry(&self) -> &Entry {
        self.statement.main_entry()
    }

    pub fn composed_entries(&self) -> &[Entry] {
        self.statement.composed_entries()
    }

    pub fn is_composed(&self) -> bool {
        self.statement.is_composed()
    }
}

impl From<Statement> for CommittableStatement {
    fn from(statement: Statement) -> Self {
        CommittableStatement {
            statement,
            committed: false,
        }
    }
}

impl From<Entry> for CommittableStatement {
    fn from(entry: Entry) -> Self {
        Statement::from(entry).into()
    }
}

impl fmt::Display for CommittableStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.committed {
            self.statement.write_lines(f, &format!("{COMMITTED_MARKER} "))
        } else {
            self.statement.write_lines(f, "  ")
        }
    }
}

// ============================================================================
// LISTING CAPABILITIES
// ============================================================================

/// What a listing needs from the statements it holds.
///
/// Implemented by [`Statement`] for archived listings and by
/// [`CommittableStatement`] for the live one.
pub trait ListingStatement: Clone + fmt::Display + From<Statement> {
    fn statement(&self) -> &Statement;

    /// Reads one statement record.
    fn read_record<R: BufRead>(reader: &mut RecordReader<R>) -> LedgerResult<Self>;

    fn is_committed(&self) -> bool {
        false
    }
}

impl ListingStatement for Statement {
    fn statement(&self) -> &Statement {
        self
    }

    fn read_record<R: BufRead>(reader: &mut RecordReader<R>) -> LedgerResult<Self> {
        let line = reader
            .next_record()?
            .ok_or_else(|| LedgerError::parse("Statement", "unexpected end of input"))?;
        Statement::read_composition(Entry::parse_line(&line)?, reader)
    }
}

impl ListingStatement for CommittableStatement {
    fn statement(&self) -> &Statement {
        &self.statement
    }

    fn read_record<R: BufRead>(reader: &mut RecordReader<R>) -> LedgerResult<Self> {
        let line = reader
            .next_record()?
            .ok_or_else(|| LedgerError::parse("Statement", "unexpected end of input"))?;

        let line = line.trim_start();
        let (committed, main_line) = match line.strip_prefix(COMMITTED_MARKER) {
            Some(rest) => (true, rest),
            None => (false, line),
        };

        let statement = Statement::read_composition(Entry::parse_line(main_line)?, reader)?;
        Ok(CommittableStatement {
            statement,
            committed,
        })
    }

    fn is_committed(&self) -> bool {
        self.committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(year: i32, month: u32, d: u32) -> NaiveDate {
        date::ymd(year, month, d).unwrap()
    }

    fn entry(amount: Money, description: &str, date: NaiveDate) -> Entry {
        Entry::new(amount, description, date).unwrap()
    }

    fn read_all<S: ListingStatement>(text: &str) -> LedgerResult<Vec<S>> {
        let mut reader = RecordReader::new(text.as_bytes());
        let mut statements = Vec::new();
        while reader.peek_record()?.is_some() {
            statements.push(S::read_record(&mut reader)?);
        }
        Ok(statements)
    }

    fn sample_statements() -> Vec<Statement> {
        let s1 = Statement::new(dec!(-12.34), "A long description with whitespaces to check just about everything", day(2018, 7, 28)).unwrap();

        let s2 = Statement::composed(
            "Another long description with whitespaces to check just about everything",
            day(2019, 7, 31),
            vec![
                entry(dec!(12), "First entry of the statement", day(2018, 7, 28)),
                entry(dec!(-12), "Second entry of the statement", day(2018, 7, 29)),
                entry(dec!(8), "third entry of the statement", day(2018, 7, 30)),
            ],
        )
        .unwrap();

        let s3 = Statement::new(dec!(3456), "Yet another long description", day(2020, 7, 28)).unwrap();

        let s4 = Statement::composed(
            "A not quite final long description",
            day(2019, 7, 31),
            vec![entry(dec!(12), "The only entry of the statement, because why not?", day(2020, 7, 28))],
        )
        .unwrap();

        let s5 = Statement::composed(
            "A final long description",
            day(2021, 7, 31),
            vec![
                entry(dec!(-12), "Another first entry of the statement", day(2018, 7, 29)),
                entry(dec!(8), "Another second entry of the statement", day(2018, 7, 30)),
            ],
        )
        .unwrap();

        vec![s1, s2, s3, s4, s5]
    }

    #[test]
    fn test_composed_sums_children() {
        let statement = Statement::composed(
            "deposits",
            day(2018, 7, 31),
            vec![
                entry(dec!(10), "first deposit.", day(2018, 7, 1)),
                entry(dec!(20), "second deposit.", day(2018, 7, 2)),
                entry(dec!(30), "third deposit.", day(2018, 7, 3)),
            ],
        )
        .unwrap();

        assert_eq!(statement.amount(), dec!(60));
        assert_eq!(statement.description(), "deposits");
        assert_eq!(statement.date(), day(2018, 7, 31));
        assert_eq!(statement.entry_count(), 3);
        assert_eq!(statement.entries().len(), 3);
    }

    #[test]
    fn test_composed_edge_cases() {
        assert!(matches!(
            Statement::composed("nothing", day(2018, 7, 31), Vec::new()),
            Err(LedgerError::EmptyComposition)
        ));

        let only = entry(dec!(12), "only", day(2018, 7, 28));
        let statement = Statement::composed("ignored", day(2018, 7, 31), vec![only.clone()]).unwrap();
        assert!(!statement.is_composed());
        assert_eq!(statement.main_entry(), &only);
        assert_eq!(statement.entries(), std::slice::from_ref(&only));
    }

    #[test]
    fn test_read_write() {
        let statements = sample_statements();
        let text: String = statements.iter().map(ToString::to_string).collect();

        let read: Vec<Statement> = read_all(&text).unwrap();
        assert_eq!(statements, read);
    }

    #[test]
    fn test_read_write_negative_year() {
        let statements = vec![
            Statement::new(dec!(1), "", day(2018, 1, 1)).unwrap(),
            Statement::new(dec!(2), "before the common era", day(-1, 1, 1)).unwrap(),
        ];
        let text: String = statements.iter().map(ToString::to_string).collect();
        assert!(text.contains("\n-0001-01-01 "));

        let read: Vec<Statement> = read_all(&text).unwrap();
        assert_eq!(statements, read);

        let committable: Vec<CommittableStatement> = statements.into_iter().map(Into::into).collect();
        let text: String = committable.iter().map(ToString::to_string).collect();
        let read: Vec<CommittableStatement> = read_all(&text).unwrap();
        assert_eq!(committable, read);
    }

    #[test]
    fn test_read_write_committable() {
        let mut statements: Vec<CommittableStatement> =
            sample_statements().into_iter().map(Into::into).collect();
        statements[2].set_committed(true);
        statements[3].set_committed(true);

        let text: String = statements.iter().map(ToString::to_string).collect();
        assert!(text.contains("# 2020-07-28"));

        let read: Vec<CommittableStatement> = read_all(&text).unwrap();
        assert_eq!(statements, read);
        assert!(read[2].is_committed());
        assert!(!read[1].is_committed());
    }

    #[test]
    fn test_committable_layout() {
        let statement: CommittableStatement = Statement::composed(
            "pair",
            day(2018, 7, 31),
            vec![
                entry(dec!(1), "a", day(2018, 7, 1)),
                entry(dec!(2), "b", day(2018, 7, 2)),
            ],
        )
        .unwrap()
        .into();

        let pending = statement.to_string();
        let lines: Vec<&str> = pending.lines().collect();
        assert!(lines[0].starts_with("  2018-07-31"));
        assert!(lines[1].starts_with("  - 2018-07-01"));

        let committed = statement.committed().to_string();
        assert!(committed.starts_with("# 2018-07-31"));
        assert!(committed.lines().nth(2).unwrap().starts_with("  - 2018-07-02"));
    }

    #[test]
    fn test_failed_read_composed() {
        let text = "\
2018-07-31          12.00 A long description with whitespaces to check just about everything
- 2018-07-28          12.00 First entry of the statement
- 2018-07-29         -12.00 Second entry of the statement
- 2018-07-30           8.00 Third entry of the statement
";
        let err = read_all::<Statement>(text).unwrap_err();
        match err {
            LedgerError::AmountMismatch { main, entries } => {
                assert_eq!(main.amount(), dec!(12));
                assert_eq!(entries.len(), 3);
                assert_eq!(entries[2].description(), "Third entry of the statement");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

// ⚠️ Error Model - every failure the ledger can report
//
// Validation errors abort the construction they occur in, parse errors abort
// the read, and file-level errors wrap their cause so the full chain survives
// up to whoever reports it.

use crate::entry::Entry;
use crate::money::{self, Money};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    // ========================================================================
    // VALIDATION
    // ========================================================================
    /// An amount carries more than two decimal digits.
    #[error("{amount}: invalid amount format, there cannot be more than two decimal digits in an amount")]
    InvalidAmountFormat { amount: Money },

    /// Year, month and day do not name a calendar date.
    #[error("invalid date {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    /// Date text could not be read.
    #[error("{text:?} is not a valid date, the expected date format is: {}", crate::date::SAMPLE_DATE)]
    InvalidDateFormat { text: String },

    /// Descriptions are single-line.
    #[error("invalid description {description:?}: descriptions cannot contain line breaks")]
    InvalidDescription { description: String },

    /// A composed statement needs at least one entry.
    #[error("cannot compose a statement out of zero entries")]
    EmptyComposition,

    // ========================================================================
    // PARSING
    // ========================================================================
    /// A record is malformed.
    #[error("parse error while reading {record}: {detail}")]
    Parse { record: &'static str, detail: String },

    /// A record failed at a known position of the stream.
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<LedgerError>,
    },

    /// The children of a composed statement don't add up to its main entry.
    #[error("{}", mismatch_message(.main, .entries))]
    AmountMismatch { main: Entry, entries: Vec<Entry> },

    // ========================================================================
    // INTEGRITY
    // ========================================================================
    /// The bytes on disk don't hash to the recorded digest.
    #[error("digest mismatch: expected {expected}, found {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// An archive could not be reloaded.
    #[error("corrupted archive {}", .path.display())]
    CorruptedArchive {
        path: PathBuf,
        #[source]
        source: Box<LedgerError>,
    },

    /// Archiving was requested but no statement is committed.
    #[error("nothing to archive in {name:?}: no statement is committed")]
    NothingToArchive { name: String },

    // ========================================================================
    // I/O
    // ========================================================================
    #[error("{}: file not found", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("{}: file already exists", .path.display())]
    FileExists { path: PathBuf },

    #[error("{}: is a directory", .path.display())]
    IsADirectory { path: PathBuf },

    /// Open, read or write failure on a named file.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Read failure on an anonymous stream.
    #[error("stream error: {0}")]
    Stream(#[from] io::Error),

    /// Any failure while reading or writing a file, with its cause.
    #[error("error in file {}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<LedgerError>,
    },
}

impl LedgerError {
    pub fn parse(record: &'static str, detail: impl Into<String>) -> Self {
        Self::Parse {
            record,
            detail: detail.into(),
        }
    }

    /// Maps an I/O failure on `path`, keeping not-found and already-exists distinct.
    pub fn io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound { path },
            io::ErrorKind::AlreadyExists => Self::FileExists { path },
            _ => Self::Io { path, source },
        }
    }

    /// Wraps any failure that happened while handling `path`.
    pub fn in_file(self, path: &Path) -> Self {
        Self::File {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }

    /// Annotates the error with the line where the failing record starts.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            Self::Stream(_) | Self::Line { .. } => self,
            other => Self::Line {
                line,
                source: Box::new(other),
            },
        }
    }

    /// Innermost ledger error of a wrapping chain.
    pub fn root_cause(&self) -> &LedgerError {
        match self {
            Self::Line { source, .. }
            | Self::CorruptedArchive { source, .. }
            | Self::File { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// True for digest mismatches, wrapped or not.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self.root_cause(), Self::DigestMismatch { .. })
    }
}

fn mismatch_message(main: &Entry, entries: &[Entry]) -> String {
    let actual = money::sum(entries.iter().map(Entry::amount));
    format!(
        "amount mismatch: the expected total amount is {}, the actual total amount is {}",
        money::format_amount(main.amount()),
        money::format_amount(actual)
    )
}

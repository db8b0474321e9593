// 🏦 Account - the live listing, its archives and the index file tying them
//
// Index file layout:
//
//   <description lines>
//
//   ¤<currency>                      (optional)
//
//   <digest>\t<live listing file>
//   <archive record>                  (zero or more, oldest first)
//
// Every file name is relative to the directory holding the index.

use crate::archive::ArchivedListing;
use crate::digest::{self, is_hex_digest, DIGEST_HEX_LEN};
use crate::error::{LedgerError, LedgerResult};
use crate::listing::{CommittableListing, PlainListing};
use crate::money::Money;
use crate::reader::RecordReader;
use crate::statement::CommittableStatement;
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extension of every listing file, live or archived.
pub const LISTING_EXTENSION: &str = "lst";

/// Prefix of the currency line in the index file.
pub const CURRENCY_MARKER: char = '¤';

pub const INITIAL_BALANCE_DESCRIPTION: &str = "Initial balance.";

#[derive(Debug, Clone)]
pub struct Account {
    directory: PathBuf,
    description: String,
    currency: Option<String>,
    current: CommittableListing,
    archives: Vec<ArchivedListing>,
}

impl Account {
    /// Empty account whose listing files live in `directory`.
    pub fn new(name: impl AsRef<str>, directory: impl Into<PathBuf>) -> Self {
        Account {
            directory: directory.into(),
            description: String::new(),
            currency: None,
            current: CommittableListing::new(name),
            archives: Vec::new(),
        }
    }

    /// Records the opening balance as a committed statement, so it ends up in
    /// the first archive.
    pub fn with_initial_balance(mut self, amount: Money, date: NaiveDate) -> LedgerResult<Self> {
        let statement = CommittableStatement::new(amount, INITIAL_BALANCE_DESCRIPTION, date)?.committed();
        self.current.add(statement);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        self.current.name()
    }

    pub fn set_name(&mut self, name: impl AsRef<str>) {
        self.current.set_name(name);
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into().trim().to_string();
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    /// Sets the currency label. Blank labels clear it.
    pub fn set_currency(&mut self, currency: impl AsRef<str>) {
        let currency = currency.as_ref().trim();
        self.currency = (!currency.is_empty()).then(|| currency.to_string());
    }

    pub fn current_listing(&self) -> &CommittableListing {
        &self.current
    }

    pub fn current_listing_mut(&mut self) -> &mut CommittableListing {
        &mut self.current
    }

    pub fn archived_listings(&self) -> &[ArchivedListing] {
        &self.archives
    }

    /// Final balance of the latest archive, zero before the first one.
    pub fn archived_balance(&self) -> Money {
        self.archives
            .last()
            .map(ArchivedListing::final_balance)
            .unwrap_or(Money::ZERO)
    }

    pub fn balance(&self) -> Money {
        self.archived_balance() + self.current.total()
    }

    // ========================================================================
    // ARCHIVING
    // ========================================================================

    /// Moves every committed statement into a new archive `<name>.lst`.
    ///
    /// Uncommitted statements stay in the live listing in their current
    /// order. Nothing changes if the archive cannot be written.
    pub fn archive(&mut self, name: impl AsRef<str>) -> LedgerResult<&ArchivedListing> {
        let name = name.as_ref();
        let path = self.directory.join(format!("{name}.{LISTING_EXTENSION}"));
        if name == self.current.name() {
            // That file holds the live listing.
            return Err(LedgerError::FileExists { path });
        }

        let (committed, pending) = self.current.partition_committed();
        if committed.is_empty() {
            return Err(LedgerError::NothingToArchive {
                name: self.current.name().to_string(),
            });
        }

        let mut archived = PlainListing::from_statements(name, committed);
        archived.stable_sort();
        let final_balance = self.archived_balance() + archived.total();
        let final_date = archived
            .last_date()
            .ok_or_else(|| LedgerError::NothingToArchive {
                name: self.current.name().to_string(),
            })?;

        let archive = ArchivedListing::create(path, archived, final_date, final_balance)?;

        self.current = CommittableListing::from_statements(self.current.name(), pending);
        self.archives.push(archive);

        info!(
            account = %self.current.name(),
            archive = %name,
            balance = %final_balance,
            remaining = self.current.len(),
            "archived committed statements"
        );
        Ok(&self.archives[self.archives.len() - 1])
    }

    /// Re-hashes every archive file.
    pub fn verify(&self) -> LedgerResult<()> {
        for archive in &self.archives {
            archive.verify().map_err(|e| e.in_file(archive.path()))?;
        }
        Ok(())
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// File name of the live listing, next to the index.
    pub fn listing_file_name(&self) -> String {
        format!("{}.{LISTING_EXTENSION}", self.current.name())
    }

    /// Writes the live listing next to `path`, then the index at `path`.
    ///
    /// An archive file is never written over: if the live listing's file
    /// name points at one, nothing is written and `FileExists` is reported.
    /// Any failure is reported as a file error on `path`.
    pub fn save_as(&self, path: &Path) -> LedgerResult<()> {
        self.write_files(path).map_err(|e| e.in_file(path))?;
        info!(
            path = %path.display(),
            statements = self.current.len(),
            archives = self.archives.len(),
            "saved account"
        );
        Ok(())
    }

    fn write_files(&self, path: &Path) -> LedgerResult<()> {
        let directory = parent_directory(path);
        let listing_file = self.listing_file_name();
        let listing_path = directory.join(&listing_file);
        if self.archives.iter().any(|archive| archive.path() == listing_path) {
            return Err(LedgerError::FileExists { path: listing_path });
        }
        let listing_digest =
            digest::write_digested(&listing_path, &self.current, true).map_err(|e| e.in_file(&listing_path))?;
        debug!(path = %listing_path.display(), digest = %listing_digest, "wrote live listing");

        let mut index = format!("{}\n\n", self.description);
        if let Some(currency) = &self.currency {
            index.push_str(&format!("{CURRENCY_MARKER}{currency}\n\n"));
        }
        index.push_str(&format!("{listing_digest}\t{listing_file}\n"));
        for archive in &self.archives {
            index.push_str(&archive.record(directory));
            index.push('\n');
        }

        digest::write_digested(path, &index, true)?;
        Ok(())
    }

    /// Reads the index at `path`, the live listing it names and every archive
    /// record. Each file is checked against its recorded digest.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        let account = Self::read_files(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "could not open account");
            e.in_file(path)
        })?;
        info!(
            path = %path.display(),
            statements = account.current.len(),
            archives = account.archives.len(),
            "opened account"
        );
        Ok(account)
    }

    fn read_files(path: &Path) -> LedgerResult<Self> {
        if path.is_dir() {
            return Err(LedgerError::IsADirectory {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path).map_err(|e| LedgerError::io(path, e))?;
        Self::read_index(BufReader::new(file), parent_directory(path))
    }

    /// Parses index text, resolving file names against `directory`.
    pub fn read_index<R: BufRead>(input: R, directory: &Path) -> LedgerResult<Self> {
        let mut records = RecordReader::new(input);

        let mut description = Vec::new();
        let mut currency: Option<String> = None;
        let listing_line = loop {
            let Some(line) = records.next_record()? else {
                return Err(LedgerError::parse("Account", "missing live listing digest"));
            };
            if starts_with_digest(&line) {
                break line;
            }
            if let Some(label) = line.strip_prefix(CURRENCY_MARKER) {
                if currency.is_some() {
                    return Err(LedgerError::parse("Account", "more than one currency line").at_line(records.line_number()));
                }
                currency = Some(label.trim().to_string());
            } else {
                description.push(line);
            }
        };

        let (listing_digest, listing_file) = listing_line.split_at(DIGEST_HEX_LEN);
        let listing_file = listing_file.trim();
        if listing_file.is_empty() {
            return Err(LedgerError::parse("Account", "missing live listing file name").at_line(records.line_number()));
        }
        let listing_path = directory.join(listing_file);
        let current = read_live_listing(&listing_path, listing_digest).map_err(|e| e.in_file(&listing_path))?;

        let mut archives = Vec::new();
        while let Some(line) = records.next_record()? {
            let line_number = records.line_number();
            let archive = ArchivedListing::parse_record(&line, directory).map_err(|e| e.at_line(line_number))?;
            archives.push(archive);
        }

        let mut account = Account {
            directory: directory.to_path_buf(),
            description: String::new(),
            currency: None,
            current,
            archives,
        };
        account.set_description(description.join("\n"));
        if let Some(currency) = currency {
            account.set_currency(currency);
        }
        Ok(account)
    }
}

fn parent_directory(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn starts_with_digest(line: &str) -> bool {
    line.get(..DIGEST_HEX_LEN).is_some_and(is_hex_digest)
}

fn read_live_listing(path: &Path, expected: &str) -> LedgerResult<CommittableListing> {
    let mut input = digest::open_digested(path)?;
    let listing = CommittableListing::read(&mut input)?;
    let actual = input.get_ref().hex_digest();
    if actual != expected {
        warn!(path = %path.display(), expected = %expected, actual = %actual, "live listing digest mismatch");
        return Err(LedgerError::DigestMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    debug!(path = %path.display(), statements = listing.len(), "loaded live listing");
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date;
    use crate::listing::Handle;
    use crate::statement::Statement;
    use rust_decimal_macros::dec;
    use std::fs;

    fn day(year: i32, month: u32, d: u32) -> NaiveDate {
        date::ymd(year, month, d).unwrap()
    }

    fn statement(amount: Money, description: &str, date: NaiveDate) -> CommittableStatement {
        CommittableStatement::new(amount, description, date).unwrap()
    }

    #[test]
    fn test_initial_balance_is_committed() {
        let dir = tempfile::tempdir().unwrap();
        let account = Account::new("checking", dir.path())
            .with_initial_balance(dec!(250.5), day(2018, 1, 1))
            .unwrap();

        assert_eq!(account.balance(), dec!(250.5));
        assert_eq!(account.archived_balance(), dec!(0));
        let first = &account.current_listing()[Handle::new(0)];
        assert!(first.is_committed());
        assert_eq!(first.description(), INITIAL_BALANCE_DESCRIPTION);
    }

    #[test]
    fn test_archive_committed_statements() {
        let dir = tempfile::tempdir().unwrap();
        let mut account = Account::new("checking", dir.path());
        {
            let listing = account.current_listing_mut();
            listing.add(statement(dec!(20), "pending", day(2018, 3, 5)));
            listing.add(statement(dec!(-5), "withdrawal", day(2018, 3, 2)).committed());
            listing.add(statement(dec!(100), "deposit", day(2018, 3, 1)).committed());
        }

        let archive = account.archive("x").unwrap();
        assert_eq!(archive.final_balance(), dec!(95));
        assert_eq!(archive.final_date(), day(2018, 3, 2));
        assert_eq!(archive.path(), dir.path().join("x.lst"));

        let archived = archive.listing().unwrap();
        assert_eq!(archived.name(), "x");
        let amounts: Vec<_> = archived.iter().map(Statement::amount).collect();
        assert_eq!(amounts, vec![dec!(100), dec!(-5)]);

        assert_eq!(account.current_listing().len(), 1);
        assert_eq!(account.current_listing()[Handle::new(0)].amount(), dec!(20));
        assert_eq!(account.current_listing().name(), "checking");
        assert_eq!(account.archived_balance(), dec!(95));
        assert_eq!(account.balance(), dec!(115));
    }

    #[test]
    fn test_archive_balances_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let mut account = Account::new("checking", dir.path())
            .with_initial_balance(dec!(10), day(2018, 1, 1))
            .unwrap();
        account.archive("2018-01").unwrap();

        account
            .current_listing_mut()
            .add(statement(dec!(2.5), "interest", day(2018, 2, 1)).committed());
        account.archive("2018-02").unwrap();

        assert_eq!(account.archived_listings().len(), 2);
        assert_eq!(account.archived_balance(), dec!(12.5));
        assert!(account.current_listing().is_empty());
        assert!(account.verify().is_ok());
    }

    #[test]
    fn test_archive_without_commitments() {
        let dir = tempfile::tempdir().unwrap();
        let mut account = Account::new("checking", dir.path());
        account.current_listing_mut().add(statement(dec!(20), "pending", day(2018, 3, 5)));

        let err = account.archive("x").unwrap_err();
        assert!(matches!(err, LedgerError::NothingToArchive { .. }));
        assert_eq!(account.current_listing().len(), 1);
        assert!(!dir.path().join("x.lst").exists());
    }

    #[test]
    fn test_failed_archive_keeps_live_listing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.lst"), "taken\n").unwrap();

        let mut account = Account::new("checking", dir.path());
        account
            .current_listing_mut()
            .add(statement(dec!(100), "deposit", day(2018, 3, 1)).committed());

        let err = account.archive("x").unwrap_err();
        assert!(matches!(err, LedgerError::FileExists { .. }));
        assert_eq!(account.current_listing().committed_count(), 1);
        assert!(account.archived_listings().is_empty());
    }

    #[test]
    fn test_archive_under_live_listing_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut account = Account::new("checking", dir.path());
        account
            .current_listing_mut()
            .add(statement(dec!(100), "deposit", day(2018, 3, 1)).committed());

        let err = account.archive("checking").unwrap_err();
        assert!(matches!(err, LedgerError::FileExists { .. }));
        assert_eq!(account.current_listing().committed_count(), 1);
        assert!(account.archived_listings().is_empty());
        assert!(!dir.path().join("checking.lst").exists());
    }

    #[test]
    fn test_save_never_overwrites_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut account = Account::new("checking", dir.path());
        account
            .current_listing_mut()
            .add(statement(dec!(100), "deposit", day(2018, 3, 1)).committed());
        account.archive("savings").unwrap();
        let archive_path = dir.path().join("savings.lst");
        let before = fs::read(&archive_path).unwrap();

        account.set_name("savings");
        let index = dir.path().join("account.idx");
        let err = account.save_as(&index).unwrap_err();

        assert!(matches!(err.root_cause(), LedgerError::FileExists { .. }));
        assert_eq!(fs::read(&archive_path).unwrap(), before);
        assert!(!index.exists());
        assert!(account.verify().is_ok());
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut account = Account::new("checking", dir.path())
            .with_initial_balance(dec!(100), day(2018, 1, 1))
            .unwrap();
        account.set_description("Main account.\nShared with nobody.");
        account.set_currency("EUR");
        account.archive("2018").unwrap();
        account
            .current_listing_mut()
            .add(statement(dec!(-12.3), "groceries", day(2018, 2, 3)));

        let index = dir.path().join("checking.idx");
        account.save_as(&index).unwrap();

        let text = fs::read_to_string(&index).unwrap();
        assert!(text.starts_with("Main account.\nShared with nobody.\n\n¤EUR\n\n"));
        assert!(text.contains("\tchecking.lst\n"));
        assert!(dir.path().join("checking.lst").exists());

        let reopened = Account::open(&index).unwrap();
        assert_eq!(reopened.description(), account.description());
        assert_eq!(reopened.currency(), Some("EUR"));
        assert_eq!(reopened.current_listing(), account.current_listing());
        assert_eq!(reopened.archived_listings().len(), 1);
        assert!(!reopened.archived_listings()[0].is_loaded());
        assert_eq!(reopened.balance(), dec!(87.7));
        assert_eq!(
            reopened.archived_listings()[0].listing().unwrap(),
            account.archived_listings()[0].listing().unwrap()
        );
    }

    #[test]
    fn test_open_detects_tampered_live_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut account = Account::new("checking", dir.path());
        account
            .current_listing_mut()
            .add(statement(dec!(100), "deposit", day(2018, 3, 1)));
        let index = dir.path().join("checking.idx");
        account.save_as(&index).unwrap();

        let live = dir.path().join("checking.lst");
        let tampered = fs::read_to_string(&live).unwrap().replace("100.00", "900.00");
        fs::write(&live, tampered).unwrap();

        let err = Account::open(&index).unwrap_err();
        assert!(matches!(err, LedgerError::File { .. }));
        assert!(err.is_integrity_error());
    }

    #[test]
    fn test_read_index_errors() {
        let dir = tempfile::tempdir().unwrap();

        let err = Account::read_index("Only a description.\n".as_bytes(), dir.path()).unwrap_err();
        assert!(matches!(err, LedgerError::Parse { record: "Account", .. }));

        let err = Account::read_index("desc\n\n¤EUR\n\n¤USD\n".as_bytes(), dir.path()).unwrap_err();
        match err {
            LedgerError::Line { line, source } => {
                assert_eq!(line, 5);
                assert!(matches!(*source, LedgerError::Parse { record: "Account", .. }));
            }
            other => panic!("unexpected error: {other}"),
        }

        let missing = format!("desc\n\n{}\tmissing.lst\n", "0".repeat(40));
        let err = Account::read_index(missing.as_bytes(), dir.path()).unwrap_err();
        assert!(matches!(err.root_cause(), LedgerError::FileNotFound { .. }));
    }

    #[test]
    fn test_open_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let err = Account::open(&dir.path().join("nope.idx")).unwrap_err();
        assert!(matches!(err.root_cause(), LedgerError::FileNotFound { .. }));
    }
}

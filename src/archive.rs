// 🗄️ Archived Listings - frozen, digest-checked snapshots of a listing
//
// An archive is a listing file plus the SHA-1 of its bytes, the date of its
// last statement and the running balance at that point. Archive files are
// created once and never overwritten; their content is only parsed when first
// asked for.

use crate::date;
use crate::digest::{self, is_hex_digest};
use crate::error::{LedgerError, LedgerResult};
use crate::listing::PlainListing;
use crate::money::{self, Money};
use crate::reader::split_token;
use chrono::NaiveDate;
use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Width of the balance column in archive records.
pub const BALANCE_WIDTH: usize = 15;

#[derive(Debug, Clone)]
pub struct ArchivedListing {
    path: PathBuf,
    digest: String,
    final_date: NaiveDate,
    final_balance: Money,
    /// Unloaded until `listing()` first succeeds.
    listing: OnceCell<PlainListing>,
}

impl ArchivedListing {
    /// Freezes `listing` into a new archive file at `path`.
    ///
    /// The listing is stable-sorted by date before being written. `path` must
    /// not exist yet.
    pub fn create(
        path: impl Into<PathBuf>,
        mut listing: PlainListing,
        final_date: NaiveDate,
        final_balance: Money,
    ) -> LedgerResult<Self> {
        let path = path.into();
        let final_balance = money::ensure_cents(final_balance)?;

        listing.stable_sort();
        let digest = digest::write_digested(&path, &listing, false)?;

        info!(
            path = %path.display(),
            statements = listing.len(),
            balance = %final_balance,
            digest = %digest,
            "archived listing"
        );

        Ok(ArchivedListing {
            path,
            digest,
            final_date,
            final_balance,
            listing: OnceCell::from(listing),
        })
    }

    /// Refers to an archive written earlier, checking right away that the
    /// file still hashes to `digest`. The listing itself is not parsed yet.
    pub fn open(
        path: impl Into<PathBuf>,
        final_date: NaiveDate,
        final_balance: Money,
        digest: impl Into<String>,
    ) -> LedgerResult<Self> {
        let path = path.into();
        let digest = digest.into();
        let final_balance = money::ensure_cents(final_balance)?;

        if !path.exists() {
            return Err(LedgerError::FileNotFound { path });
        }
        if path.is_dir() {
            return Err(LedgerError::IsADirectory { path });
        }

        let actual = digest::file_digest(&path)?;
        if actual != digest {
            warn!(path = %path.display(), expected = %digest, actual = %actual, "archive digest mismatch");
            return Err(LedgerError::DigestMismatch {
                expected: digest,
                actual,
            });
        }

        Ok(ArchivedListing {
            path,
            digest,
            final_date,
            final_balance,
            listing: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn final_date(&self) -> NaiveDate {
        self.final_date
    }

    pub fn final_balance(&self) -> Money {
        self.final_balance
    }

    pub fn is_loaded(&self) -> bool {
        self.listing.get().is_some()
    }

    /// The archived listing, parsed and digest-checked on first access.
    ///
    /// A parse failure or a digest mismatch is reported as a corrupted
    /// archive wrapping the cause. An archive built by `create` starts out
    /// loaded, so later changes to its file only show up through `verify`
    /// or when the archive is opened again.
    pub fn listing(&self) -> LedgerResult<&PlainListing> {
        if let Some(listing) = self.listing.get() {
            return Ok(listing);
        }

        let mut input = digest::open_digested(&self.path)?;
        let listing = PlainListing::read(&mut input)
            .and_then(|listing| {
                let actual = input.get_ref().hex_digest();
                if actual == self.digest {
                    Ok(listing)
                } else {
                    Err(LedgerError::DigestMismatch {
                        expected: self.digest.clone(),
                        actual,
                    })
                }
            })
            .map_err(|source| {
                warn!(path = %self.path.display(), error = %source, "corrupted archive");
                LedgerError::CorruptedArchive {
                    path: self.path.clone(),
                    source: Box::new(source),
                }
            })?;

        debug!(path = %self.path.display(), statements = listing.len(), "loaded archive");
        Ok(self.listing.get_or_init(|| listing))
    }

    /// Re-hashes the file as it is now.
    pub fn verify(&self) -> LedgerResult<()> {
        let actual = digest::file_digest(&self.path)?;
        if actual == self.digest {
            Ok(())
        } else {
            Err(LedgerError::DigestMismatch {
                expected: self.digest.clone(),
                actual,
            })
        }
    }

    /// Formats the index record, naming the file relative to `directory`
    /// when it lives there.
    pub fn record(&self, directory: &Path) -> String {
        let file = self.path.strip_prefix(directory).unwrap_or(&self.path);
        format!(
            "{} {:>width$}\t{} {}",
            date::format_date(self.final_date),
            money::format_amount(self.final_balance),
            self.digest,
            file.display(),
            width = BALANCE_WIDTH
        )
    }

    /// Reads an index record and opens the archive it names, resolving the
    /// file against `directory`.
    pub fn parse_record(line: &str, directory: &Path) -> LedgerResult<Self> {
        let missing = |field: &str| LedgerError::parse("Archived Listing", format!("missing {field} in {line:?}"));

        let (date_text, rest) = split_token(line).ok_or_else(|| missing("date"))?;
        let (balance_text, rest) = split_token(rest).ok_or_else(|| missing("balance"))?;
        let (digest_text, file) = split_token(rest).ok_or_else(|| missing("digest"))?;
        if file.is_empty() {
            return Err(missing("file name"));
        }
        if !is_hex_digest(digest_text) {
            return Err(LedgerError::parse(
                "Archived Listing",
                format!("{digest_text:?} is not a digest"),
            ));
        }

        Self::open(
            directory.join(file),
            date::parse_date(date_text)?,
            money::parse_amount(balance_text)?,
            digest_text,
        )
    }
}

impl fmt::Display for ArchivedListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let directory = self.path.parent().unwrap_or_else(|| Path::new(""));
        f.write_str(&self.record(directory))
    }
}

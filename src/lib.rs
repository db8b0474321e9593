// Listing Ledger - Core Library
// Exposes the listing engine, archive persistence and account handling for the CLI and tests

pub mod error;
pub mod money;
pub mod date;
pub mod reader;
pub mod entry;
pub mod statement;
pub mod listing;
pub mod digest;
pub mod archive;
pub mod account;
pub mod import;      // CSV import of pending statements
pub mod config;
pub mod telemetry;

// Re-export commonly used types
pub use error::{LedgerError, LedgerResult};
pub use money::Money;
pub use entry::Entry;
pub use statement::{CommittableStatement, ListingStatement, Statement};
pub use listing::{
    CommittableListing, Handle, HandleRange, Listing, PlainListing, Selection,
};
pub use archive::ArchivedListing;
pub use account::Account;
pub use import::{import_into, load_csv};
pub use config::LedgerConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ⚙️ Configuration - where the ledger lives and how loudly it logs
//
// Values come from an optional JSON file named by LEDGER_CONFIG, then the
// LEDGER_DATA_DIR / LEDGER_ACCOUNT_FILE / LEDGER_LOG variables override it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_VAR: &str = "LEDGER_CONFIG";
pub const DATA_DIR_VAR: &str = "LEDGER_DATA_DIR";
pub const ACCOUNT_FILE_VAR: &str = "LEDGER_ACCOUNT_FILE";
pub const LOG_VAR: &str = "LEDGER_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Directory holding the index, the live listing and the archives.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Index file name inside `data_dir`.
    #[serde(default = "default_account_file")]
    pub account_file: String,

    /// Name given to the live listing of a new account.
    #[serde(default = "default_account_name")]
    pub account_name: String,

    /// `tracing` filter directive, `RUST_LOG` wins over it.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_account_file() -> String {
    "account.idx".to_string()
}

fn default_account_name() -> String {
    "current".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            account_file: default_account_file(),
            account_name: default_account_name(),
            log_filter: default_log_filter(),
        }
    }
}

impl LedgerConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(CONFIG_VAR) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(dir) = lookup(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup(ACCOUNT_FILE_VAR) {
            config.account_file = file;
        }
        if let Some(filter) = lookup(LOG_VAR) {
            config.log_filter = filter;
        }

        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    pub fn account_path(&self) -> PathBuf {
        self.data_dir.join(&self.account_file)
    }
}

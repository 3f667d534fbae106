//! Process configuration resolved from the environment.
//!
//! | variable              | default                         |
//! |-----------------------|---------------------------------|
//! | `ACCOUNTS_DB_PATH`    | `<temp dir>/accounts.sqlite3`   |
//! | `ACCOUNTS_LOG_LEVEL`  | `default_log_level()`           |
//! | `ACCOUNTS_LOG_DIR`    | unset (file logging disabled)   |

use crate::logging::{default_log_level, LogLevel};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "ACCOUNTS_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "ACCOUNTS_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "ACCOUNTS_LOG_DIR";
const DEFAULT_DB_FILE_NAME: &str = "accounts.sqlite3";

/// Runtime settings for binaries embedding the account core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountsConfig {
    pub db_path: PathBuf,
    pub log_level: LogLevel,
    pub log_dir: Option<PathBuf>,
}

impl AccountsConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(DB_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        let log_level = match read(LOG_LEVEL_ENV) {
            Some(raw) => raw
                .parse::<LogLevel>()
                .map_err(|err| format!("{LOG_LEVEL_ENV}: {err}"))?,
            None => default_log_level(),
        };
        let log_dir = read(LOG_DIR_ENV).map(PathBuf::from);

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}

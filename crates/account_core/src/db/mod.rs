//! SQLite session bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections that back the account store.
//! - Create the account schema through ordered migrations.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Callers must not touch the `accounts` table before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage-level failure raised while opening or migrating a session.
#[derive(Debug)]
pub enum DbError {
    /// SQLite refused to open the account database or run a schema statement.
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build whose `accounts` schema this
    /// build cannot read safely.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "account schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

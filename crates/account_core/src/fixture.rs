//! JSON fixture loading for seeding and tests.
//!
//! A fixture is a JSON array of account objects:
//!
//! ```json
//! [{ "name": "Ana", "email": "ana@example.com", "phone_number": "555-0100", "disabled": false }]
//! ```
//!
//! Records go through `Account::from_dict`, so `date_joined` in a fixture is
//! ignored and every loaded account is unsaved.

use crate::model::account::{Account, AccountValidationError};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type FixtureResult<T> = Result<T, FixtureError>;

#[derive(Debug)]
pub enum FixtureError {
    Io(std::io::Error),
    Json(serde_json::Error),
    NotAnArray,
    Record {
        index: usize,
        source: AccountValidationError,
    },
}

impl Display for FixtureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read fixture: {err}"),
            Self::Json(err) => write!(f, "malformed fixture json: {err}"),
            Self::NotAnArray => write!(f, "fixture must be a json array of account objects"),
            Self::Record { index, source } => write!(f, "fixture record {index}: {source}"),
        }
    }
}

impl Error for FixtureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::NotAnArray => None,
            Self::Record { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for FixtureError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for FixtureError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Reads and parses a fixture file.
pub fn load_fixture(path: impl AsRef<Path>) -> FixtureResult<Vec<Account>> {
    let raw = std::fs::read_to_string(path)?;
    parse_fixture(&raw)
}

/// Parses fixture text into unsaved accounts, in file order.
pub fn parse_fixture(raw: &str) -> FixtureResult<Vec<Account>> {
    let Value::Array(records) = serde_json::from_str::<Value>(raw)? else {
        return Err(FixtureError::NotAnArray);
    };

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let object = record.as_object().ok_or_else(|| FixtureError::Record {
                index,
                source: AccountValidationError::InvalidField {
                    field: "record",
                    reason: "expected an object".to_string(),
                },
            })?;
            Account::from_json_object(object)
                .map_err(|source| FixtureError::Record { index, source })
        })
        .collect()
}

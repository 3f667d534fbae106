//! Account entity.
//!
//! # Responsibility
//! - Hold the fields of one row of the `accounts` table.
//! - Expose entity-level CRUD entry points that delegate to a repository.
//! - Convert to and from plain JSON objects (`to_dict` / `from_dict`).
//!
//! # Invariants
//! - `id` and `date_joined` are `None` until `create()` succeeds and are both
//!   reset by `delete()`.
//! - `date_joined` is assigned by `create()` only; `from_dict()` never sets it.
//! - Write paths call `validate()` before any SQL runs.

use crate::repo::account_repo::{AccountListQuery, AccountRepository, RepoResult};
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("valid email regex"));

/// Row identifier assigned by the database on insert.
pub type AccountId = i64;

/// Validation failure for account state or account input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    /// Update/delete was attempted on an account that was never created.
    MissingId,
    /// `name` is empty or whitespace only.
    BlankName,
    /// `email` does not look like `local@domain.tld`.
    InvalidEmail(String),
    /// A dictionary field is missing or has the wrong JSON type.
    InvalidField { field: &'static str, reason: String },
}

impl Display for AccountValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "account has no id; create it before update or delete"),
            Self::BlankName => write!(f, "account name must not be blank"),
            Self::InvalidEmail(email) => write!(f, "invalid account email `{email}`"),
            Self::InvalidField { field, reason } => {
                write!(f, "invalid account field `{field}`: {reason}")
            }
        }
    }
}

impl Error for AccountValidationError {}

/// One customer account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Database identifier; `None` while the account only lives in memory.
    #[serde(default)]
    pub id: Option<AccountId>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub disabled: bool,
    /// Set by `create()`. Incoming JSON never populates it.
    #[serde(skip_deserializing, serialize_with = "serialize_date_joined")]
    pub date_joined: Option<DateTime<Utc>>,
}

impl Account {
    /// Creates an in-memory, enabled account with no phone number.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Builds a fresh (unsaved) account from a JSON object.
    pub fn from_json_object(data: &Map<String, Value>) -> Result<Self, AccountValidationError> {
        let mut account = Self::default();
        account.from_dict(data)?;
        Ok(account)
    }

    /// Checks the field rules every persisted account must satisfy.
    pub fn validate(&self) -> Result<(), AccountValidationError> {
        if self.name.trim().is_empty() {
            return Err(AccountValidationError::BlankName);
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(AccountValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }

    /// Returns whether this instance is backed by a stored row.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Inserts this account and stores the assigned `id` and `date_joined`.
    ///
    /// A stale `id` on the instance is ignored; a new row is always inserted.
    pub fn create<R: AccountRepository + ?Sized>(&mut self, repo: &R) -> RepoResult<AccountId> {
        repo.create_account(self)
    }

    /// Persists the mutable fields of an already created account.
    ///
    /// # Errors
    /// - `AccountValidationError::MissingId` when `id` is unset.
    /// - `RepoError::NotFound` when no row has this `id`.
    pub fn update<R: AccountRepository + ?Sized>(&self, repo: &R) -> RepoResult<()> {
        repo.update_account(self)
    }

    /// Removes the stored row and clears `id` and `date_joined`.
    pub fn delete<R: AccountRepository + ?Sized>(&mut self, repo: &R) -> RepoResult<()> {
        let id = self.id.ok_or(AccountValidationError::MissingId)?;
        repo.delete_account(id)?;
        self.id = None;
        self.date_joined = None;
        Ok(())
    }

    /// Returns every stored account ordered by id.
    pub fn all<R: AccountRepository + ?Sized>(repo: &R) -> RepoResult<Vec<Account>> {
        repo.list_accounts(&AccountListQuery::default())
    }

    /// Looks up one account by id.
    pub fn find<R: AccountRepository + ?Sized>(
        repo: &R,
        id: AccountId,
    ) -> RepoResult<Option<Account>> {
        repo.get_account(id)
    }

    /// Returns all accounts whose name matches exactly.
    pub fn find_by_name<R: AccountRepository + ?Sized>(
        repo: &R,
        name: &str,
    ) -> RepoResult<Vec<Account>> {
        repo.find_by_name(name)
    }

    /// Serializes every field into a JSON object.
    ///
    /// `date_joined` is rendered as an RFC 3339 (ISO-8601) UTC string, or
    /// `null` for accounts that were never created.
    pub fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        dict.insert("id".to_string(), self.id.map_or(Value::Null, Value::from));
        dict.insert("name".to_string(), Value::from(self.name.as_str()));
        dict.insert("email".to_string(), Value::from(self.email.as_str()));
        dict.insert(
            "phone_number".to_string(),
            Value::from(self.phone_number.as_str()),
        );
        dict.insert("disabled".to_string(), Value::Bool(self.disabled));
        dict.insert(
            "date_joined".to_string(),
            self.date_joined
                .map_or(Value::Null, |joined| Value::from(format_timestamp(joined))),
        );
        dict
    }

    /// Copies fields from a JSON object onto this account.
    ///
    /// Keys are applied one by one when present and non-null; absent keys keep
    /// the current value. `name` and `email` must end up non-empty, so they are
    /// required only when the account does not hold them yet. `date_joined`
    /// and unknown keys are ignored. On error the account is left unchanged.
    pub fn from_dict(&mut self, data: &Map<String, Value>) -> Result<(), AccountValidationError> {
        let id = optional_field(data, "id", "an integer", Value::as_i64)?;
        let name = optional_field(data, "name", "a string", Value::as_str)?;
        let email = optional_field(data, "email", "a string", Value::as_str)?;
        if name.is_none() && self.name.is_empty() {
            return Err(missing_field("name"));
        }
        if email.is_none() && self.email.is_empty() {
            return Err(missing_field("email"));
        }
        let phone_number = optional_field(data, "phone_number", "a string", Value::as_str)?;
        let disabled = optional_field(data, "disabled", "a boolean", Value::as_bool)?;

        if id.is_some() {
            self.id = id;
        }
        if let Some(name) = name {
            self.name = name.to_string();
        }
        if let Some(email) = email {
            self.email = email.to_string();
        }
        if let Some(phone_number) = phone_number {
            self.phone_number = phone_number.to_string();
        }
        if let Some(disabled) = disabled {
            self.disabled = disabled;
        }
        Ok(())
    }
}

impl Display for Account {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Account '{}'>", self.name)
    }
}

/// Canonical text form of `date_joined`, shared by storage and `to_dict`.
pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn missing_field(field: &'static str) -> AccountValidationError {
    AccountValidationError::InvalidField {
        field,
        reason: "missing required field".to_string(),
    }
}

fn serialize_date_joined<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(joined) => serializer.serialize_str(&format_timestamp(*joined)),
        None => serializer.serialize_none(),
    }
}

fn optional_field<'a, T>(
    data: &'a Map<String, Value>,
    field: &'static str,
    expected: &str,
    extract: impl Fn(&'a Value) -> Option<T>,
) -> Result<Option<T>, AccountValidationError> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => extract(value)
            .map(Some)
            .ok_or_else(|| AccountValidationError::InvalidField {
                field,
                reason: format!("expected {expected}, got {}", json_type_name(value)),
            }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

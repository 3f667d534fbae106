//! Account repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `accounts` table.
//! - Map rows to `Account` values and reject corrupt persisted state.
//!
//! # Invariants
//! - `create_account` always inserts a new row and assigns `id` + `date_joined`.
//! - `update_account` never rewrites `date_joined`.
//! - Log lines carry ids and counts only, never names, emails or phone numbers.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::account::{format_timestamp, Account, AccountId, AccountValidationError};
use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ACCOUNTS_TABLE: &str = "accounts";
const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "name",
    "email",
    "phone_number",
    "disabled",
    "date_joined",
];

const ACCOUNT_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    phone_number,
    disabled,
    date_joined
FROM accounts";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for account persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(AccountValidationError),
    Db(DbError),
    NotFound(AccountId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "account not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted account data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match {expected_version}; open it with open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<AccountValidationError> for RepoError {
    fn from(value: AccountValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter and pagination options for listing accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountListQuery {
    /// Only accounts with this `disabled` flag, when set.
    pub disabled: Option<bool>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Data access contract for accounts.
pub trait AccountRepository {
    /// Inserts `account`, writing the new `id` and `date_joined` back into it.
    fn create_account(&self, account: &mut Account) -> RepoResult<AccountId>;
    /// Persists name, email, phone number and disabled flag.
    fn update_account(&self, account: &Account) -> RepoResult<()>;
    fn get_account(&self, id: AccountId) -> RepoResult<Option<Account>>;
    fn list_accounts(&self, query: &AccountListQuery) -> RepoResult<Vec<Account>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Account>>;
    fn delete_account(&self, id: AccountId) -> RepoResult<()>;
    /// Removes every row and returns how many were deleted.
    fn delete_all_accounts(&self) -> RepoResult<usize>;
}

/// SQLite-backed account repository bound to one session.
pub struct SqliteAccountRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccountRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version is not current.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   was tampered with.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AccountRepository for SqliteAccountRepository<'_> {
    fn create_account(&self, account: &mut Account) -> RepoResult<AccountId> {
        account.validate()?;

        let date_joined = Utc::now().trunc_subsecs(6);
        self.conn.execute(
            "INSERT INTO accounts (
                name,
                email,
                phone_number,
                disabled,
                date_joined
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                account.name.as_str(),
                account.email.as_str(),
                account.phone_number.as_str(),
                account.disabled,
                format_timestamp(date_joined),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        account.id = Some(id);
        account.date_joined = Some(date_joined);
        info!("event=account_create module=repo status=ok account_id={id}");
        Ok(id)
    }

    fn update_account(&self, account: &Account) -> RepoResult<()> {
        let Some(id) = account.id else {
            warn!("event=account_update module=repo status=error error_code=missing_id");
            return Err(AccountValidationError::MissingId.into());
        };
        account.validate()?;

        let changed = self.conn.execute(
            "UPDATE accounts
             SET
                name = ?1,
                email = ?2,
                phone_number = ?3,
                disabled = ?4
             WHERE id = ?5;",
            params![
                account.name.as_str(),
                account.email.as_str(),
                account.phone_number.as_str(),
                account.disabled,
                id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        info!("event=account_update module=repo status=ok account_id={id}");
        Ok(())
    }

    fn get_account(&self, id: AccountId) -> RepoResult<Option<Account>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ACCOUNT_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_account_row(row)?));
        }

        Ok(None)
    }

    fn list_accounts(&self, query: &AccountListQuery) -> RepoResult<Vec<Account>> {
        let mut sql = format!("{ACCOUNT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(disabled) = query.disabled {
            sql.push_str(" AND disabled = ?");
            bind_values.push(Value::Integer(i64::from(disabled)));
        }

        sql.push_str(" ORDER BY id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut accounts = Vec::new();
        while let Some(row) = rows.next()? {
            accounts.push(parse_account_row(row)?);
        }

        debug!(
            "event=account_list module=repo status=ok count={}",
            accounts.len()
        );
        Ok(accounts)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Account>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ACCOUNT_SELECT_SQL} WHERE name = ?1 ORDER BY id ASC;"))?;
        let mut rows = stmt.query([name])?;
        let mut accounts = Vec::new();
        while let Some(row) = rows.next()? {
            accounts.push(parse_account_row(row)?);
        }
        Ok(accounts)
    }

    fn delete_account(&self, id: AccountId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM accounts WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        info!("event=account_delete module=repo status=ok account_id={id}");
        Ok(())
    }

    fn delete_all_accounts(&self) -> RepoResult<usize> {
        let removed = self.conn.execute("DELETE FROM accounts;", [])?;
        info!("event=account_truncate module=repo status=ok removed={removed}");
        Ok(removed)
    }
}

/// Inserts a batch of accounts in one transaction.
///
/// Either every account is stored (and receives its `id`/`date_joined`) or,
/// on the first failure, the transaction rolls back and no account in the
/// batch is modified.
pub fn create_accounts_atomic(
    conn: &mut Connection,
    accounts: &mut [Account],
) -> RepoResult<Vec<AccountId>> {
    ensure_connection_ready(conn)?;

    let mut staged = accounts.to_vec();
    let tx = conn.transaction()?;
    let mut ids = Vec::with_capacity(staged.len());
    {
        let repo = SqliteAccountRepository { conn: &tx };
        for (index, account) in staged.iter_mut().enumerate() {
            match repo.create_account(account) {
                Ok(id) => ids.push(id),
                Err(err) => {
                    warn!(
                        "event=account_batch_create module=repo status=rollback failed_index={index} batch_size={}",
                        accounts.len()
                    );
                    return Err(err);
                }
            }
        }
    }
    tx.commit()?;

    accounts.clone_from_slice(&staged);
    info!(
        "event=account_batch_create module=repo status=ok count={}",
        ids.len()
    );
    Ok(ids)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [ACCOUNTS_TABLE],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(ACCOUNTS_TABLE));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([ACCOUNTS_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for &column in REQUIRED_COLUMNS {
        if !columns.iter().any(|existing| existing == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: ACCOUNTS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn parse_account_row(row: &Row<'_>) -> RepoResult<Account> {
    let id: AccountId = row.get("id")?;

    let disabled = match row.get::<_, i64>("disabled")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid disabled value `{other}` in accounts.disabled (id {id})"
            )));
        }
    };

    let joined_text: String = row.get("date_joined")?;
    let date_joined = DateTime::parse_from_rfc3339(&joined_text)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid timestamp `{joined_text}` in accounts.date_joined (id {id})"
            ))
        })?;

    Ok(Account {
        id: Some(id),
        name: row.get("name")?,
        email: row.get("email")?,
        phone_number: row.get("phone_number")?,
        disabled,
        date_joined: Some(date_joined),
    })
}

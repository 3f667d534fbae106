//! Account store core.
//! Owns the `Account` entity, its SQLite persistence and the invariants around
//! its lifecycle.

pub mod config;
pub mod db;
pub mod fixture;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::AccountsConfig;
pub use fixture::{load_fixture, parse_fixture, FixtureError, FixtureResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::account::{Account, AccountId, AccountValidationError};
pub use repo::account_repo::{
    create_accounts_atomic, AccountListQuery, AccountRepository, RepoError, RepoResult,
    SqliteAccountRepository,
};
pub use service::account_service::{AccountService, RegisterAccountRequest};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

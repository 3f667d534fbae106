//! Account use-case service.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - The service stays storage-agnostic; it only sees `AccountRepository`.

use crate::model::account::{Account, AccountId};
use crate::repo::account_repo::{AccountListQuery, AccountRepository, RepoError, RepoResult};

/// Request model for registering a new account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterAccountRequest {
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

/// Use-case wrapper around an account repository.
pub struct AccountService<R: AccountRepository> {
    repo: R,
}

impl<R: AccountRepository> AccountService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an enabled account and returns the stored record.
    pub fn register(&self, request: &RegisterAccountRequest) -> RepoResult<Account> {
        let mut account = Account::new(request.name.clone(), request.email.clone());
        if let Some(phone_number) = request.phone_number.as_ref() {
            account.phone_number = phone_number.clone();
        }
        account.create(&self.repo)?;
        Ok(account)
    }

    pub fn get(&self, id: AccountId) -> RepoResult<Option<Account>> {
        Account::find(&self.repo, id)
    }

    pub fn list(&self, query: &AccountListQuery) -> RepoResult<Vec<Account>> {
        self.repo.list_accounts(query)
    }

    pub fn find_by_name(&self, name: &str) -> RepoResult<Vec<Account>> {
        Account::find_by_name(&self.repo, name)
    }

    /// Changes the display name of an existing account.
    pub fn rename(&self, id: AccountId, name: impl Into<String>) -> RepoResult<Account> {
        self.modify(id, |account| account.name = name.into())
    }

    /// Enables or disables an existing account.
    pub fn set_disabled(&self, id: AccountId, disabled: bool) -> RepoResult<Account> {
        self.modify(id, |account| account.disabled = disabled)
    }

    /// Deletes one account by id.
    pub fn remove(&self, id: AccountId) -> RepoResult<()> {
        self.repo.delete_account(id)
    }

    /// Deletes every account; returns the number of removed rows.
    pub fn purge(&self) -> RepoResult<usize> {
        self.repo.delete_all_accounts()
    }

    fn modify(&self, id: AccountId, change: impl FnOnce(&mut Account)) -> RepoResult<Account> {
        let mut account = Account::find(&self.repo, id)?.ok_or(RepoError::NotFound(id))?;
        change(&mut account);
        account.update(&self.repo)?;
        Ok(account)
    }
}

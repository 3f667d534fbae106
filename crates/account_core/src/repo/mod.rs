//! Repository layer for account persistence.
//!
//! # Responsibility
//! - Define the data access contract used by the entity and service layers.
//! - Keep SQL details inside the SQLite implementation.
//!
//! # Invariants
//! - Writes enforce `Account::validate()` before touching the database.
//! - Semantic errors (`NotFound`, `Validation`) are reported separately from
//!   transport errors.

pub mod account_repo;

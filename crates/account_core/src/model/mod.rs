//! Domain model for the account store.
//!
//! # Responsibility
//! - Define the `Account` entity and its field-level validation rules.
//! - Provide the dictionary (JSON object) projection used by fixtures and the CLI.
//!
//! # Invariants
//! - An account without `id` has never been persisted (or has been deleted).

pub mod account;

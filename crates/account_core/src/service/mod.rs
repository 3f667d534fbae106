//! Account use-case services.
//!
//! # Responsibility
//! - Wrap repository calls into caller-facing use cases.
//! - Keep CLI and other front ends decoupled from storage details.

pub mod account_service;

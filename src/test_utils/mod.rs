//! Test utilities for integration testing.
//!
//! This module provides:
//! - Token and session factories signed with a fixed test secret
//! - In-memory implementations of the identity provider, profile store and avatar storage
//! - A builder for an `AppState` wired to those in-memory ports

mod app_state_builder;
mod auth_mocks;
mod factories;
mod profile_mocks;

pub use app_state_builder::*;
pub use auth_mocks::*;
pub use factories::*;
pub use profile_mocks::*;

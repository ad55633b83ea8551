//! Shared test utilities for transjob integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a job service to a file drop provider over an
//!   isolated file store
//! - `ScriptedProvider` for driving failures and delays from tests
//! - Builders for requests, content items and translation sets

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{ScriptedProvider, TestHarness};

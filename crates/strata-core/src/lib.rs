//! Strata Core - Foundational types for the Strata terrain engine
//!
//! This crate provides the error type and `Result` alias shared by every
//! other Strata crate.

mod error;

pub use error::{Result, StrataError};

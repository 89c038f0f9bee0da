//! # va-core
//!
//! Core types, traits, and utilities for SmartVA RS.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Common error types
//! - Result type alias
//! - Core traits (Identifiable, Owned)
//! - Pagination types
//! - Configuration types

pub mod config;
pub mod error;
pub mod pagination;
pub mod result;
pub mod traits;
pub mod types;

pub use error::*;
pub use pagination::*;
pub use result::*;
pub use traits::*;
pub use types::*;

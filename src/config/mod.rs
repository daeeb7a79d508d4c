//! Configuration module for tileforge
//!
//! Provides types and parsing for `tileforge.toml` configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;

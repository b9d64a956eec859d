//! recipebox: a recipe management API.
//!
//! Accounts are identified by email and authenticate with opaque bearer
//! tokens. Recipes, tags and ingredients are owned by exactly one account and
//! every read or write is scoped to the caller's own records.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod passwords;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{Error, FieldErrors, Result};

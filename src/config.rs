//! Configuration loader and schema types.
//!
//! This module exposes the settings that tune progress estimation, the
//! engine and catalog storage, plus helpers to load them from disk.

mod load;
mod schema;

pub use schema::*;

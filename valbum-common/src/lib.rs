//! # Valbum Common Library
//!
//! Shared code for the valbum services including:
//! - Error types
//! - Configuration resolution
//! - Timestamp formats and helpers
//! - Database bootstrap and schema

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use config::AppConfig;
pub use error::{Error, Result};

//! # YSR Common Library
//!
//! Shared code for the youth-services records backend:
//! - Entity models (participants, programs, staff)
//! - SQLite schema and entity queries
//! - Staff token authentication primitives
//! - Configuration loading and root folder resolution

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};

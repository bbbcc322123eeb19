//! HTTP API handlers for ysr-import

pub mod auth;
pub mod health;
pub mod import;

pub use auth::{AuthenticatedStaff, ElevatedStaff};
pub use health::health_routes;
pub use import::import_routes;

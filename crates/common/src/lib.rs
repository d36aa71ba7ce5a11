//! Contactdesk Common Library
//!
//! Shared code for the Contactdesk API including:
//! - Server-side sessions (signed tokens, key-value store, manager)
//! - The authorization gate for protected endpoints
//! - Contact submission models and repository
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod kv;
pub mod metrics;
pub mod session;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use session::{SessionManager, SessionRecord, UserData};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

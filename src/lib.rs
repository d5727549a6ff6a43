//! paycheck - subscription activation checks against a payments database
//!
//! # Features
//!
//! Pick the database backends you need; at least one is required:
//!
//! - `sqlite` - SQLite backend. Enabled by default.
//! - `postgres` - PostgreSQL backend.
//! - `mysql` - MySQL backend.
//!
//! # Example
//!
//! ```toml
//! # Use defaults (sqlite)
//! paycheck = { path = "../paycheck" }
//!
//! # MySQL only
//! paycheck = { path = "../paycheck", default-features = false, features = ["mysql"] }
//! ```

#[cfg(not(any(feature = "sqlite", feature = "postgres", feature = "mysql")))]
compile_error!("paycheck needs at least one of the 'sqlite', 'postgres' or 'mysql' features");

pub mod cli;
pub mod config;
pub mod connection;
pub mod database;
pub mod errors;
pub mod gateway;
pub mod logging;

pub use connection::ConnectionProvider;
pub use database::{Database, PaymentRecord};
pub use errors::{GatewayError, GatewayResult};
pub use gateway::{ActivationReport, ConnectionStatus, LicensingGateway};

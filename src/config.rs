//! Configuration system for paycheck.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `PAYCHECK_DATABASE_TYPE` - Database backend: sqlite, postgres or mysql
//! - `PAYCHECK_DATABASE_URL` - Connection URL, credentials included; routed to
//!   the backend matching its scheme
//! - `PAYCHECK_PROBE_TABLE` - Table targeted by the liveness probe
//! - `PAYCHECK_PAYMENTS_TABLE` - Table holding payment records
//! - `PAYCHECK_ACTIVE_STATUS` - Status code that marks a company as activated
//! - `PAYCHECK_LOOKUP_STRATEGY` - `scan` (client-side filter) or `filtered`
//! - `PAYCHECK_LOGGING_ENABLED` - Install the tracing subscriber
//! - `PAYCHECK_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::Config;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{GatewayError, GatewayResult};

/// Global configuration singleton.
static CONFIG: OnceLock<PaycheckConfig> = OnceLock::new();

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaycheckConfig {
    /// Database connection configuration
    pub database: DatabaseConfig,
    /// Liveness probe configuration
    pub probe: ProbeConfig,
    /// Activation lookup configuration
    pub lookup: LookupConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite", "postgres" or "mysql"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
    /// MySQL connection URL
    pub mysql_url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://paycheck.db".to_string(),
            postgres_url: "postgres://localhost/paycheck".to_string(),
            mysql_url: "mysql://localhost/paycheck".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// The URL for the configured backend, if the backend is known.
    pub fn active_url(&self) -> Option<&str> {
        match self.db_type.as_str() {
            "sqlite" => Some(&self.sqlite_url),
            "postgres" => Some(&self.postgres_url),
            "mysql" => Some(&self.mysql_url),
            _ => None,
        }
    }
}

/// Liveness probe configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Any existing table; the probe runs `SELECT 1 FROM <table>`
    pub table: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            table: "files".to_string(),
        }
    }
}

/// How the payments table is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupStrategy {
    /// Read every row and match company names client-side.
    #[default]
    Scan,
    /// Let the database filter on a case-insensitive company name.
    Filtered,
}

/// Activation lookup configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Table holding `company_name` / `status` rows
    pub table: String,
    /// Status code meaning "all payments have been made"
    pub active_status: String,
    /// Query strategy
    pub strategy: LookupStrategy,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            table: "payments".to_string(),
            active_status: "W".to_string(),
            strategy: LookupStrategy::Scan,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
        }
    }
}

fn config_err(e: config::ConfigError) -> GatewayError {
    GatewayError::ConfigError(e.to_string())
}

/// Routes `PAYCHECK_DATABASE_URL` to the backend whose scheme it carries.
fn database_url_for(scheme: &str) -> Option<String> {
    env::var("PAYCHECK_DATABASE_URL")
        .ok()
        .filter(|url| url.starts_with(scheme))
}

/// Whether `name` can be spliced into SQL as a bare table identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
        .is_match(name)
}

impl PaycheckConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    fn load() -> GatewayResult<Self> {
        let builder = Config::builder()
            .set_default("database.db_type", "sqlite")
            .map_err(config_err)?
            .set_default("database.sqlite_url", "sqlite://paycheck.db")
            .map_err(config_err)?
            .set_default("database.postgres_url", "postgres://localhost/paycheck")
            .map_err(config_err)?
            .set_default("database.mysql_url", "mysql://localhost/paycheck")
            .map_err(config_err)?
            .set_default("probe.table", "files")
            .map_err(config_err)?
            .set_default("lookup.table", "payments")
            .map_err(config_err)?
            .set_default("lookup.active_status", "W")
            .map_err(config_err)?
            .set_default("lookup.strategy", "scan")
            .map_err(config_err)?
            .set_default("logging.enabled", false)
            .map_err(config_err)?
            .set_default("logging.level", "info")
            .map_err(config_err)?
            .add_source(config::File::with_name("config").required(false))
            .set_override_option(
                "database.db_type",
                env::var("PAYCHECK_DATABASE_TYPE")
                    .ok()
                    .map(|s| s.to_lowercase()),
            )
            .map_err(config_err)?
            .set_override_option("database.sqlite_url", database_url_for("sqlite"))
            .map_err(config_err)?
            .set_override_option("database.postgres_url", database_url_for("postgres"))
            .map_err(config_err)?
            .set_override_option("database.mysql_url", database_url_for("mysql"))
            .map_err(config_err)?
            .set_override_option("probe.table", env::var("PAYCHECK_PROBE_TABLE").ok())
            .map_err(config_err)?
            .set_override_option("lookup.table", env::var("PAYCHECK_PAYMENTS_TABLE").ok())
            .map_err(config_err)?
            .set_override_option(
                "lookup.active_status",
                env::var("PAYCHECK_ACTIVE_STATUS").ok(),
            )
            .map_err(config_err)?
            .set_override_option(
                "lookup.strategy",
                env::var("PAYCHECK_LOOKUP_STRATEGY")
                    .ok()
                    .map(|s| s.to_lowercase()),
            )
            .map_err(config_err)?
            .set_override_option(
                "logging.enabled",
                env::var("PAYCHECK_LOGGING_ENABLED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("PAYCHECK_LOG_LEVEL").ok())
            .map_err(config_err)?;

        let settings = builder
            .build()
            .map_err(|e| GatewayError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| GatewayError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.database.active_url().is_none() {
            return Err(GatewayError::ConfigError(format!(
                "database.db_type must be 'sqlite', 'postgres' or 'mysql', got '{}'",
                self.database.db_type
            )));
        }

        for (key, table) in [
            ("probe.table", &self.probe.table),
            ("lookup.table", &self.lookup.table),
        ] {
            if !is_valid_identifier(table) {
                return Err(GatewayError::ConfigError(format!(
                    "{key} must be a plain table name, got '{table}'"
                )));
            }
        }

        if self.lookup.active_status.is_empty() {
            return Err(GatewayError::ConfigError(
                "lookup.active_status cannot be empty".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(GatewayError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }
}

/// Load and validate a fresh configuration, bypassing the cache.
pub fn load_config() -> GatewayResult<PaycheckConfig> {
    let config = PaycheckConfig::load()?;
    config.validate()?;
    Ok(config)
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> GatewayResult<&'static PaycheckConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = load_config()?;

    // Another thread may have won the race; either value is valid.
    let _ = CONFIG.set(config);

    CONFIG
        .get()
        .ok_or_else(|| GatewayError::ConfigError("configuration was not stored".to_string()))
}

/// Initialize configuration explicitly.
///
/// Call this early in your application to catch configuration errors.
pub fn init_config() -> GatewayResult<&'static PaycheckConfig> {
    get_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PaycheckConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lookup.active_status, "W");
        assert_eq!(config.lookup.strategy, LookupStrategy::Scan);
        assert_eq!(config.probe.table, "files");
    }

    #[test]
    fn rejects_unknown_backend() {
        let mut config = PaycheckConfig::default();
        config.database.db_type = "oracle".to_string();
        assert!(matches!(
            config.validate(),
            Err(GatewayError::ConfigError(msg)) if msg.contains("oracle")
        ));
    }

    #[test]
    fn rejects_table_names_that_are_not_identifiers() {
        let mut config = PaycheckConfig::default();
        config.lookup.table = "payments; DROP TABLE payments".to_string();
        assert!(config.validate().is_err());

        let mut config = PaycheckConfig::default();
        config.probe.table = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_active_status() {
        let mut config = PaycheckConfig::default();
        config.lookup.active_status = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = PaycheckConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn active_url_follows_db_type() {
        let mut db = DatabaseConfig::default();
        assert_eq!(db.active_url(), Some("sqlite://paycheck.db"));

        db.db_type = "mysql".to_string();
        assert_eq!(db.active_url(), Some("mysql://localhost/paycheck"));

        db.db_type = "mssql".to_string();
        assert_eq!(db.active_url(), None);
    }

    #[test]
    fn identifier_check() {
        assert!(is_valid_identifier("payments"));
        assert!(is_valid_identifier("_files2"));
        assert!(!is_valid_identifier("2files"));
        assert!(!is_valid_identifier("public.payments"));
    }
}

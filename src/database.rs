use sqlx::{query, query_as, FromRow};

#[cfg(feature = "sqlite")]
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

#[cfg(feature = "postgres")]
use sqlx::{postgres::PgPoolOptions, PgPool};

#[cfg(feature = "mysql")]
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};

use crate::config::DatabaseConfig;
use crate::errors::{GatewayError, GatewayResult};

/// A row of the payments table.
///
/// Only the two columns the activation check reads are mapped; both are
/// nullable on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PaymentRecord {
    pub company_name: Option<String>,
    pub status: Option<String>,
}

impl PaymentRecord {
    pub fn new(company_name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            company_name: Some(company_name.into()),
            status: Some(status.into()),
        }
    }

    /// Case-insensitive company name comparison. A NULL name never matches.
    pub fn matches_company(&self, company: &str) -> bool {
        self.company_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase() == company.to_lowercase())
    }

    /// Exact comparison of the status code against the activation sentinel.
    pub fn has_status(&self, sentinel: &str) -> bool {
        self.status.as_deref() == Some(sentinel)
    }
}

/// Database handle over one of the compiled-in sqlx backends.
///
/// Each variant wraps a pool capped at a single connection, so one handle is
/// one session with the remote store.
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
}

impl Database {
    /// Open a connection for the backend named in `config.db_type`.
    ///
    /// Fails with `UnsupportedBackend` when the type is unknown or its feature
    /// is not compiled in, and with `ConnectionError` when the open fails.
    pub async fn connect(config: &DatabaseConfig) -> GatewayResult<Self> {
        match config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect(&config.sqlite_url)
                    .await
                    .map_err(|e| {
                        GatewayError::ConnectionError(format!("failed to connect to SQLite: {e}"))
                    })?;

                Ok(Database::SQLite(pool))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(GatewayError::UnsupportedBackend(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect(&config.postgres_url)
                    .await
                    .map_err(|e| {
                        GatewayError::ConnectionError(format!(
                            "failed to connect to PostgreSQL: {e}"
                        ))
                    })?;

                Ok(Database::Postgres(pool))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(GatewayError::UnsupportedBackend(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            #[cfg(feature = "mysql")]
            "mysql" => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(1)
                    .connect(&config.mysql_url)
                    .await
                    .map_err(|e| {
                        GatewayError::ConnectionError(format!("failed to connect to MySQL: {e}"))
                    })?;

                Ok(Database::MySql(pool))
            }
            #[cfg(not(feature = "mysql"))]
            "mysql" => Err(GatewayError::UnsupportedBackend(
                "MySQL support not compiled in. Enable the 'mysql' feature.".to_string(),
            )),
            other => Err(GatewayError::UnsupportedBackend(format!(
                "unknown database type: {other}"
            ))),
        }
    }

    /// Backend name, as spelled in `database.db_type`.
    pub fn kind(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
            #[cfg(feature = "mysql")]
            Database::MySql(_) => "mysql",
        }
    }

    /// Run `SELECT 1 FROM <table>` and discard the result.
    ///
    /// `table` must already be a validated identifier.
    pub async fn probe(&self, table: &str) -> GatewayResult<()> {
        let sql = format!("SELECT 1 FROM {table}");

        let result = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(&sql).fetch_optional(pool).await.map(|_| ()),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(&sql).fetch_optional(pool).await.map(|_| ()),
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => query(&sql).fetch_optional(pool).await.map(|_| ()),
        };

        result.map_err(|e| GatewayError::QueryError(format!("probe of {table} failed: {e}")))
    }

    /// Fetch every payment record in `table`, unfiltered.
    pub async fn fetch_payments(&self, table: &str) -> GatewayResult<Vec<PaymentRecord>> {
        let sql = format!("SELECT company_name, status FROM {table}");

        let rows = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, PaymentRecord>(&sql).fetch_all(pool).await,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, PaymentRecord>(&sql).fetch_all(pool).await,
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => query_as::<_, PaymentRecord>(&sql).fetch_all(pool).await,
        };

        rows.map_err(|e| read_error(table, e))
    }

    /// Fetch the payment records whose company name matches `company`,
    /// ignoring case, filtered on the database side.
    ///
    /// On SQLite this reads the whole table; callers must still match names
    /// themselves.
    #[cfg_attr(
        not(any(feature = "postgres", feature = "mysql")),
        allow(unused_variables)
    )]
    pub async fn fetch_payments_for(
        &self,
        table: &str,
        company: &str,
    ) -> GatewayResult<Vec<PaymentRecord>> {
        match self {
            // SQLite's LOWER() only folds ASCII, so the name match is left to
            // `PaymentRecord::matches_company`.
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => self.fetch_payments(table).await,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let sql = format!(
                    "SELECT company_name, status FROM {table} \
                     WHERE LOWER(company_name) = LOWER($1)"
                );
                query_as::<_, PaymentRecord>(&sql)
                    .bind(company)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| read_error(table, e))
            }
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => {
                let sql = format!(
                    "SELECT company_name, status FROM {table} \
                     WHERE LOWER(company_name) = LOWER(?)"
                );
                query_as::<_, PaymentRecord>(&sql)
                    .bind(company)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| read_error(table, e))
            }
        }
    }
}

fn read_error(table: &str, e: sqlx::Error) -> GatewayError {
    GatewayError::QueryError(format!("reading {table} failed: {e}"))
}

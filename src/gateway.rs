//! Subscription activation checks.
//!
//! [`LicensingGateway`] answers one question: has this company paid? It
//! validates the shared connection, reads the payments table and compares the
//! matching row's status code against the configured activation status.
//!
//! Every failure degrades to "not activated" plus a log line; nothing is
//! raised to the caller.
//!
//! # Usage
//!
//! ```rust,ignore
//! use paycheck::config::get_config;
//! use paycheck::gateway::LicensingGateway;
//!
//! let gateway = LicensingGateway::new(get_config()?.clone())?;
//! if !gateway.get_activation_status("Acme").await {
//!     // restrict access
//! }
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{LookupConfig, LookupStrategy, PaycheckConfig, ProbeConfig};
use crate::connection::ConnectionProvider;
use crate::database::{Database, PaymentRecord};
use crate::errors::GatewayResult;
use crate::logging::{log_activation_event, ActivationEvent, LOG_TARGET};

/// Result of validating the shared connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// The probe query succeeded.
    Valid,
    /// The probe query failed and the handle was dropped.
    Reset,
    /// No handle could be obtained.
    Unavailable,
}

/// Details of one activation lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub company: String,
    pub activated: bool,
    /// Rows whose company name matched
    pub matched_rows: usize,
    /// Status code of the last matching row
    pub status: Option<String>,
    /// Outcome of the connection check that preceded the lookup
    pub connection: ConnectionStatus,
}

impl ActivationReport {
    fn not_activated(company: &str, connection: ConnectionStatus) -> Self {
        Self {
            company: company.to_string(),
            activated: false,
            matched_rows: 0,
            status: None,
            connection,
        }
    }
}

/// Fold payment records into an activation decision.
///
/// Every row whose company name matches `company` (ignoring case) replaces the
/// decision made by earlier matches, so with duplicate names the last row in
/// iteration order wins.
pub fn evaluate_records<'a, I>(
    records: I,
    company: &str,
    active_status: &str,
) -> (bool, usize, Option<String>)
where
    I: IntoIterator<Item = &'a PaymentRecord>,
{
    let mut activated = false;
    let mut matched = 0;
    let mut status = None;

    for record in records {
        if !record.matches_company(company) {
            continue;
        }
        matched += 1;
        activated = record.has_status(active_status);
        status = record.status.clone();
    }

    (activated, matched, status)
}

/// Activation checks against the payments table.
#[derive(Debug)]
pub struct LicensingGateway {
    provider: ConnectionProvider,
    probe: ProbeConfig,
    lookup: LookupConfig,
}

impl LicensingGateway {
    /// Build a gateway that connects lazily using `config.database`.
    pub fn new(config: PaycheckConfig) -> GatewayResult<Self> {
        config.validate()?;

        Ok(Self {
            provider: ConnectionProvider::new(config.database),
            probe: config.probe,
            lookup: config.lookup,
        })
    }

    /// Build a gateway from the global configuration.
    pub fn from_config() -> GatewayResult<Self> {
        Self::new(crate::config::get_config()?.clone())
    }

    /// Build a gateway around an already open database.
    ///
    /// Once `db` is invalidated, reconnection uses `config.database`.
    pub fn with_database(config: PaycheckConfig, db: Database) -> GatewayResult<Self> {
        config.validate()?;

        Ok(Self {
            provider: ConnectionProvider::with_database(config.database, db),
            probe: config.probe,
            lookup: config.lookup,
        })
    }

    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    /// Probe the shared connection, dropping it if the probe fails.
    pub async fn check_connection(&self) -> ConnectionStatus {
        let Some(db) = self.provider.get_connection().await else {
            warn!(
                target: LOG_TARGET,
                "The connection is no longer valid. Resetting connection for next request."
            );
            self.provider.reset().await;
            return ConnectionStatus::Unavailable;
        };

        match db.probe(&self.probe.table).await {
            Ok(()) => {
                info!(target: LOG_TARGET, "Connection is valid");
                ConnectionStatus::Valid
            }
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    error = %e,
                    "The connection is no longer valid. Resetting connection for next request."
                );
                self.provider.invalidate(&db).await;
                ConnectionStatus::Reset
            }
        }
    }

    /// Validate the shared connection.
    ///
    /// Always returns `true`, whether or not the probe succeeded; the only
    /// observable difference is that a failed probe drops the handle. Use
    /// [`check_connection`](Self::check_connection) for the real outcome.
    pub async fn test_connection(&self) -> bool {
        self.check_connection().await;
        true
    }

    /// Whether `company` has a payment record carrying the activation status.
    ///
    /// Returns `false` on any failure.
    pub async fn get_activation_status(&self, company: &str) -> bool {
        self.activation_report(company).await.activated
    }

    /// Run an activation lookup and report how the decision was reached.
    pub async fn activation_report(&self, company: &str) -> ActivationReport {
        let connection = self.check_connection().await;

        if company.trim().is_empty() {
            log_activation_event(
                ActivationEvent::LookupFailed,
                company,
                Some("empty company name"),
            );
            return ActivationReport::not_activated(company, connection);
        }

        // A reset above leaves the slot empty; this reopens it.
        let Some(db) = self.provider.get_connection().await else {
            log_activation_event(
                ActivationEvent::LookupFailed,
                company,
                Some("no database connection"),
            );
            return ActivationReport::not_activated(company, connection);
        };

        let records = match self.fetch(&db, company).await {
            Ok(records) => records,
            Err(e) => {
                error!(target: LOG_TARGET, error = %e, "Error occurred in fetching data");
                log_activation_event(ActivationEvent::LookupFailed, company, Some(&e.to_string()));
                return ActivationReport::not_activated(company, connection);
            }
        };

        let (activated, matched_rows, status) =
            evaluate_records(&records, company, &self.lookup.active_status);

        let event = match (activated, matched_rows) {
            (true, _) => ActivationEvent::Activated,
            (false, 0) => ActivationEvent::NoMatch,
            (false, _) => ActivationEvent::NotActivated,
        };
        log_activation_event(event, company, status.as_deref());

        ActivationReport {
            company: company.to_string(),
            activated,
            matched_rows,
            status,
            connection,
        }
    }

    async fn fetch(&self, db: &Arc<Database>, company: &str) -> GatewayResult<Vec<PaymentRecord>> {
        match self.lookup.strategy {
            LookupStrategy::Scan => db.fetch_payments(&self.lookup.table).await,
            LookupStrategy::Filtered => db.fetch_payments_for(&self.lookup.table, company).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, status: &str) -> PaymentRecord {
        PaymentRecord::new(name, status)
    }

    #[test]
    fn sentinel_status_activates() {
        let records = vec![record("Acme", "W")];
        let (activated, matched, status) = evaluate_records(&records, "Acme", "W");
        assert!(activated);
        assert_eq!(matched, 1);
        assert_eq!(status.as_deref(), Some("W"));
    }

    #[test]
    fn other_status_does_not_activate() {
        let records = vec![record("Acme", "X")];
        let (activated, matched, _) = evaluate_records(&records, "Acme", "W");
        assert!(!activated);
        assert_eq!(matched, 1);
    }

    #[test]
    fn name_match_ignores_case() {
        let records = vec![record("Acme", "W"), record("Globex", "X")];
        assert_eq!(
            evaluate_records(&records, "ACME", "W"),
            evaluate_records(&records, "acme", "W")
        );
        assert!(evaluate_records(&records, "ACME", "W").0);
    }

    #[test]
    fn no_match_is_not_activated() {
        let empty: Vec<PaymentRecord> = Vec::new();
        assert_eq!(evaluate_records(&empty, "Acme", "W"), (false, 0, None));

        let records = vec![record("Globex", "W")];
        assert!(!evaluate_records(&records, "Acme", "W").0);
    }

    #[test]
    fn last_matching_row_wins() {
        let records = vec![record("Acme", "W"), record("ACME", "X")];
        let (activated, matched, status) = evaluate_records(&records, "acme", "W");
        assert!(!activated);
        assert_eq!(matched, 2);
        assert_eq!(status.as_deref(), Some("X"));

        let records = vec![record("Acme", "X"), record("Acme", "W")];
        assert!(evaluate_records(&records, "Acme", "W").0);
    }

    #[test]
    fn null_rows_are_skipped() {
        let records = vec![
            PaymentRecord {
                company_name: None,
                status: Some("W".to_string()),
            },
            PaymentRecord {
                company_name: Some("Acme".to_string()),
                status: None,
            },
        ];
        let (activated, matched, status) = evaluate_records(&records, "Acme", "W");
        assert!(!activated);
        assert_eq!(matched, 1);
        assert_eq!(status, None);
    }
}

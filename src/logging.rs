//! Logging for paycheck.
//!
//! Gateway events are emitted under the fixed target [`LOG_TARGET`] so they
//! can be filtered out of a host application's logs, e.g.
//! `RUST_LOG=paycheck::gateway=debug` with an env-filter subscriber.

use std::str::FromStr;

use tracing::{info, info_span, warn, Level};

use crate::config::LoggingConfig;

/// Target attached to every gateway log line.
pub const LOG_TARGET: &str = "paycheck::gateway";

/// Outcome of an activation lookup, for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationEvent {
    /// A matching row carried the activation status
    Activated,
    /// Matching rows exist but none ended on the activation status
    NotActivated,
    /// No row matched the company name
    NoMatch,
    /// The lookup could not be performed
    LookupFailed,
}

impl std::fmt::Display for ActivationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivationEvent::Activated => "activated",
            ActivationEvent::NotActivated => "not_activated",
            ActivationEvent::NoMatch => "no_match",
            ActivationEvent::LookupFailed => "lookup_failed",
        };
        write!(f, "{}", s)
    }
}

/// Log the outcome of an activation lookup.
///
/// # Arguments
///
/// * `event` - What the lookup concluded
/// * `company` - The company name that was looked up
/// * `details` - Optional additional details (e.g. the error)
pub fn log_activation_event(event: ActivationEvent, company: &str, details: Option<&str>) {
    let span = info_span!(
        target: LOG_TARGET,
        "activation_lookup",
        event = %event,
        company = %company,
    );
    let _enter = span.enter();

    match event {
        ActivationEvent::Activated => info!(target: LOG_TARGET, "All payments have been made"),
        ActivationEvent::LookupFailed => match details {
            Some(d) => warn!(target: LOG_TARGET, reason = %d, "Activation lookup failed"),
            None => warn!(target: LOG_TARGET, "Activation lookup failed"),
        },
        _ => match details {
            Some(d) => info!(target: LOG_TARGET, details = %d, "Company is not activated"),
            None => info!(target: LOG_TARGET, "Company is not activated"),
        },
    }
}

/// Parse a configured log level, falling back to `INFO`.
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level).unwrap_or(Level::INFO)
}

/// Install a `tracing-subscriber` fmt subscriber when logging is enabled.
///
/// Returns `true` if a subscriber was installed by this call. A subscriber
/// already set by the host application is left in place.
pub fn init_logging(config: &LoggingConfig) -> bool {
    if !config.enabled {
        return false;
    }

    tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.level))
        .with_target(true)
        .try_init()
        .is_ok()
}

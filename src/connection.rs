//! The shared database handle.
//!
//! `ConnectionProvider` owns at most one open `Database`. The handle is opened
//! lazily on first access, reused until someone invalidates it, and reopened
//! on the next access after that.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::config::DatabaseConfig;
use crate::database::Database;
use crate::logging::LOG_TARGET;

/// Lazily opened, resettable single database handle.
#[derive(Debug)]
pub struct ConnectionProvider {
    config: DatabaseConfig,
    slot: Mutex<Option<Arc<Database>>>,
}

impl ConnectionProvider {
    /// Create a provider with an empty slot. Nothing is opened until the first
    /// call to [`get_connection`](Self::get_connection).
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
        }
    }

    /// Create a provider whose slot already holds `db`.
    ///
    /// `config` is still used to reopen a connection once `db` is invalidated.
    pub fn with_database(config: DatabaseConfig, db: Database) -> Self {
        Self {
            config,
            slot: Mutex::new(Some(Arc::new(db))),
        }
    }

    /// Return the cached handle, opening one if the slot is empty.
    ///
    /// The cached handle is returned as-is, without re-validation. Open
    /// failures are logged and reported as `None`; the slot stays empty.
    pub async fn get_connection(&self) -> Option<Arc<Database>> {
        // Held across the open so concurrent callers never both connect.
        let mut slot = self.slot.lock().await;

        if let Some(db) = slot.as_ref() {
            return Some(Arc::clone(db));
        }

        warn!(target: LOG_TARGET, db_type = %self.config.db_type, "Connection is absent, opening a new one");

        match Database::connect(&self.config).await {
            Ok(db) => {
                debug!(target: LOG_TARGET, db_type = db.kind(), "Connection established");
                let db = Arc::new(db);
                *slot = Some(Arc::clone(&db));
                Some(db)
            }
            Err(e) => {
                error!(target: LOG_TARGET, error = %e, "Could not open connection");
                None
            }
        }
    }

    /// Drop the cached handle so the next access reopens.
    pub async fn reset(&self) {
        self.slot.lock().await.take();
    }

    /// Drop the cached handle only if it is still `db`.
    ///
    /// Returns `true` when the slot was cleared. A handle reopened by another
    /// caller in the meantime is left alone.
    pub async fn invalidate(&self, db: &Arc<Database>) -> bool {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(current) if Arc::ptr_eq(current, db) => {
                slot.take();
                true
            }
            _ => false,
        }
    }

    /// Whether the slot currently holds a handle. Does not probe it.
    pub async fn is_connected(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

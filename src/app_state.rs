//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{
    Error,
    categorization::CategorizationRule,
    connection::ConnectionLifecycle,
    db::initialize,
    provider::BankingProvider,
    sync::SyncOrchestrator,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// Synchronizes bank connections with the provider.
    pub orchestrator: SyncOrchestrator,

    /// Links and unlinks banks.
    pub lifecycle: ConnectionLifecycle,

    /// The rules used to suggest categories for bank transactions.
    pub categorization_rules: Arc<Vec<CategorizationRule>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        provider: Arc<dyn BankingProvider>,
        categorization_rules: Vec<CategorizationRule>,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));
        let orchestrator = SyncOrchestrator::new(connection.clone(), provider);

        Ok(Self {
            db_connection: connection,
            lifecycle: ConnectionLifecycle::new(orchestrator.clone()),
            orchestrator,
            categorization_rules: Arc::new(categorization_rules),
        })
    }
}

impl FromRef<AppState> for SyncOrchestrator {
    fn from_ref(state: &AppState) -> Self {
        state.orchestrator.clone()
    }
}

impl FromRef<AppState> for ConnectionLifecycle {
    fn from_ref(state: &AppState) -> Self {
        state.lifecycle.clone()
    }
}

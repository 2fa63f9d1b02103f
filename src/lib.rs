//! Renoveur is a budgeting tool for home renovation projects.
//!
//! This library provides the bank connection subsystem: linking a bank
//! through a third-party aggregation provider, pulling its transactions into
//! a local store without duplicates, suggesting a category for each of them
//! and letting the user convert them into expenses or ignore them. It is
//! exposed as a JSON API consumed by the frontend.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod bank_transaction;
mod categorization;
mod config;
mod connection;
mod database_id;
mod db;
mod endpoints;
mod error;
mod logging;
mod provider;
mod routing;
mod sync;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use bank_transaction::{
    BankTransaction, TransactionStatus, convert_transaction, ignore_transaction,
    list_bank_transactions, upsert_transaction,
};
pub use categorization::{
    CategorizationRule, CategorySuggestion, OTHER_CATEGORY, categorize, default_rules, load_rules,
};
pub use config::ProviderConfig;
pub use connection::{Authorization, BankConnection, ConnectionLifecycle, mark_unauthorized};
pub use database_id::{ConnectionId, DatabaseId, ExpenseId, ProjectId, TransactionId, UserId};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use provider::{BankingProvider, ProviderClient, ProviderError};
pub use routing::build_router;
pub use sync::{SyncOrchestrator, SyncReport, SyncStatus, sync_all_connections, sync_task};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

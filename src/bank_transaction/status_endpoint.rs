//! Defines the endpoints for converting or ignoring a bank transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState,
    bank_transaction::status::{convert_transaction, ignore_transaction},
    database_id::{ExpenseId, TransactionId},
    db::with_db,
};

/// The state needed to change the status of a bank transaction.
#[derive(Debug, Clone)]
pub struct TransactionStatusState {
    /// The database connection for updating transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionStatusState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for converting a transaction into an expense.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConvertForm {
    /// The expense the transaction was turned into.
    pub expense_id: ExpenseId,
}

/// A route handler for marking a new transaction as converted into an
/// expense, responds with the updated transaction.
pub async fn convert_transaction_endpoint(
    State(state): State<TransactionStatusState>,
    Path(transaction_id): Path<TransactionId>,
    Json(form): Json<ConvertForm>,
) -> Response {
    with_db(&state.db_connection, |connection| {
        convert_transaction(transaction_id, form.expense_id, connection)
    })
    .map(|transaction| (StatusCode::OK, Json(transaction)).into_response())
    .unwrap_or_else(|error| {
        tracing::warn!("Could not convert bank transaction {transaction_id}: {error}");
        error.into_response()
    })
}

/// A route handler for marking a new transaction as ignored, responds with
/// the updated transaction.
pub async fn ignore_transaction_endpoint(
    State(state): State<TransactionStatusState>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    with_db(&state.db_connection, |connection| {
        ignore_transaction(transaction_id, connection)
    })
    .map(|transaction| (StatusCode::OK, Json(transaction)).into_response())
    .unwrap_or_else(|error| {
        tracing::warn!("Could not ignore bank transaction {transaction_id}: {error}");
        error.into_response()
    })
}

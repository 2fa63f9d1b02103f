//! Defines the endpoint for listing the transactions of a bank connection.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    bank_transaction::core::{BankTransaction, TransactionStatus, list_bank_transactions},
    categorization::{CategorizationRule, CategorySuggestion, categorize},
    connection::get_connection,
    database_id::ConnectionId,
    db::with_db,
};

/// The state needed to list bank transactions.
#[derive(Debug, Clone)]
pub struct TransactionListState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The rules used to suggest a category for each transaction.
    pub categorization_rules: Arc<Vec<CategorizationRule>>,
}

impl FromRef<AppState> for TransactionListState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            categorization_rules: state.categorization_rules.clone(),
        }
    }
}

/// The query parameters for listing bank transactions.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// Only list transactions with this status.
    pub status: Option<TransactionStatus>,
}

/// A bank transaction with a category suggestion computed when it was listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionWithSuggestion {
    /// The stored transaction.
    #[serde(flatten)]
    pub transaction: BankTransaction,
    /// The suggested category, never stored.
    pub suggestion: CategorySuggestion,
}

/// A route handler for listing the transactions of a bank connection, newest first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionListState>,
    Path(connection_id): Path<ConnectionId>,
    Query(query): Query<ListTransactionsQuery>,
) -> Response {
    let transactions = with_db(&state.db_connection, |connection| {
        get_connection(connection_id, connection)?;
        list_bank_transactions(connection_id, query.status, connection)
    });

    match transactions {
        Ok(transactions) => {
            let transactions: Vec<TransactionWithSuggestion> = transactions
                .into_iter()
                .map(|transaction| TransactionWithSuggestion {
                    suggestion: categorize(&transaction.description, &state.categorization_rules),
                    transaction,
                })
                .collect();

            (StatusCode::OK, Json(transactions)).into_response()
        }
        Err(error) => {
            tracing::error!("Could not list transactions of connection {connection_id}: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod list_transactions_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
    };
    use rusqlite::Connection;

    use crate::{
        bank_transaction::{
            ListTransactionsQuery, TransactionListState, TransactionStatus, convert_transaction,
            list_transactions_endpoint, upsert_transaction,
        },
        categorization::{OTHER_CATEGORY, default_rules},
        test_utils::{
            get_test_connection, insert_test_connection, new_bank_transaction, parse_json_body,
        },
    };

    fn state(conn: Connection) -> TransactionListState {
        TransactionListState {
            db_connection: Arc::new(Mutex::new(conn)),
            categorization_rules: Arc::new(default_rules()),
        }
    }

    #[tokio::test]
    async fn attaches_suggestions() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        upsert_transaction(&new_bank_transaction(bank.id, "t1"), &conn).unwrap();
        let mut unknown = new_bank_transaction(bank.id, "t2");
        unknown.description = "xyz unknown".to_owned();
        unknown.occurred_at = time::macros::date!(2024 - 12 - 01);
        upsert_transaction(&unknown, &conn).unwrap();

        let response = list_transactions_endpoint(
            State(state(conn)),
            Path(bank.id),
            Query(ListTransactionsQuery::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = parse_json_body(response).await;
        let transactions = body.as_array().unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0]["external_id"], "t1");
        assert_eq!(transactions[0]["status"], "NEW");
        assert_eq!(transactions[0]["suggestion"]["category"], "Matériaux");
        assert!(transactions[0]["suggestion"]["confidence"].as_f64().unwrap() > 0.0);
        assert_eq!(transactions[1]["suggestion"]["category"], OTHER_CATEGORY);
        assert_eq!(transactions[1]["suggestion"]["confidence"], 0.0);
    }

    #[tokio::test]
    async fn filters_by_status() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let converted = upsert_transaction(&new_bank_transaction(bank.id, "t1"), &conn).unwrap();
        upsert_transaction(&new_bank_transaction(bank.id, "t2"), &conn).unwrap();
        convert_transaction(converted.id, 9, &conn).unwrap();

        let response = list_transactions_endpoint(
            State(state(conn)),
            Path(bank.id),
            Query(ListTransactionsQuery {
                status: Some(TransactionStatus::Converted),
            }),
        )
        .await;

        let body = parse_json_body(response).await;
        let transactions = body.as_array().unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0]["external_id"], "t1");
        assert_eq!(transactions[0]["linked_expense_id"], 9);
    }

    #[tokio::test]
    async fn missing_connection_is_not_found() {
        let response = list_transactions_endpoint(
            State(state(get_test_connection())),
            Path(1),
            Query(ListTransactionsQuery::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

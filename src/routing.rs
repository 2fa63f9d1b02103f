//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::{
    AppState,
    bank_transaction::{
        convert_transaction_endpoint, ignore_transaction_endpoint, list_transactions_endpoint,
    },
    connection::{authorize_endpoint, disconnect_endpoint, list_connections_endpoint},
    endpoints,
    logging::logging_middleware,
    sync::sync_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::AUTHORIZE, post(authorize_endpoint))
        .route(
            endpoints::PROJECT_CONNECTIONS,
            get(list_connections_endpoint),
        )
        .route(endpoints::CONNECTION, delete(disconnect_endpoint))
        .route(endpoints::SYNC_CONNECTION, post(sync_endpoint))
        .route(
            endpoints::CONNECTION_TRANSACTIONS,
            get(list_transactions_endpoint),
        )
        .route(
            endpoints::CONVERT_TRANSACTION,
            post(convert_transaction_endpoint),
        )
        .route(
            endpoints::IGNORE_TRANSACTION,
            post(ignore_transaction_endpoint),
        )
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

//! Defines the endpoint for unlinking a bank.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{connection::lifecycle::ConnectionLifecycle, database_id::ConnectionId};

/// A route handler for unlinking a bank, responds with no content.
///
/// The connection is deleted locally even if the provider could not revoke it.
pub async fn disconnect_endpoint(
    State(lifecycle): State<ConnectionLifecycle>,
    Path(connection_id): Path<ConnectionId>,
) -> Response {
    match lifecycle.disconnect(connection_id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => {
            tracing::error!("Could not disconnect bank connection {connection_id}: {error}");
            error.into_response()
        }
    }
}

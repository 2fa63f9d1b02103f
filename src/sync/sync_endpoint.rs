//! Defines the endpoint for synchronizing a bank connection on demand.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    database_id::ConnectionId,
    sync::orchestrator::{SyncOrchestrator, SyncStatus},
};

/// A route handler for synchronizing a bank connection, responds with the
/// synchronization report.
///
/// An expired credential is reported with a success status code because the
/// request itself was handled: the report tells the client to reconnect.
pub async fn sync_endpoint(
    State(orchestrator): State<SyncOrchestrator>,
    Path(connection_id): Path<ConnectionId>,
) -> Response {
    let report = orchestrator.synchronize(connection_id).await;

    let status_code = match report.status {
        SyncStatus::Ok | SyncStatus::TokenExpired => StatusCode::OK,
        SyncStatus::AlreadySyncing => StatusCode::CONFLICT,
        SyncStatus::Failed => StatusCode::BAD_GATEWAY,
    };

    (status_code, Json(report)).into_response()
}

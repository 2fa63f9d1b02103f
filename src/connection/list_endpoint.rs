//! Defines the endpoint for listing the bank connections of a project.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, connection::core::list_connections_for_project, database_id::ProjectId,
    db::with_db,
};

/// The state needed to list bank connections.
#[derive(Debug, Clone)]
pub struct ListConnectionsState {
    /// The database connection for reading bank connections.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListConnectionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the live bank connections of a project.
///
/// Credentials are never included in the response.
pub async fn list_connections_endpoint(
    State(state): State<ListConnectionsState>,
    Path(project_id): Path<ProjectId>,
) -> Response {
    with_db(&state.db_connection, |connection| {
        list_connections_for_project(project_id, connection)
    })
    .map(|connections| (StatusCode::OK, Json(connections)).into_response())
    .unwrap_or_else(|error| {
        tracing::error!("Could not list bank connections of project {project_id}: {error}");
        error.into_response()
    })
}

//! Defines the endpoint for linking a bank to a project.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    Error,
    connection::lifecycle::ConnectionLifecycle,
    database_id::{ProjectId, UserId},
};

/// The request body for linking a bank.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthorizeForm {
    /// The one-time code the provider sent back to the redirect URI.
    pub code: String,
    /// The user who linked the bank.
    pub owner_user_id: UserId,
    /// The project the bank's transactions belong to.
    pub owner_project_id: ProjectId,
}

/// A route handler for linking a bank, responds with the connection and the
/// result of its first synchronization.
pub async fn authorize_endpoint(
    State(lifecycle): State<ConnectionLifecycle>,
    Json(form): Json<AuthorizeForm>,
) -> Response {
    let code = form.code.trim();
    if code.is_empty() {
        return Error::MissingAuthorizationCode.into_response();
    }

    match lifecycle
        .authorize(code, form.owner_user_id, form.owner_project_id)
        .await
    {
        Ok(authorization) => (StatusCode::CREATED, Json(authorization)).into_response(),
        Err(error) => {
            tracing::error!("Could not link bank for project {}: {error}", form.owner_project_id);
            error.into_response()
        }
    }
}

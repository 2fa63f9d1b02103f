//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{bank_transaction::TransactionStatus, provider::ProviderError};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An upstream record could not be stored, e.g. it has no external ID.
    ///
    /// Records without a stable external ID cannot be deduplicated, so they
    /// are rejected instead of being given a synthetic key.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A bank transaction was asked to move to a status it cannot reach from
    /// its current status.
    #[error("cannot change a transaction from {from} to {to}")]
    InvalidStatusTransition {
        /// The current status of the transaction.
        from: TransactionStatus,
        /// The requested status.
        to: TransactionStatus,
    },

    /// The authorization code exchange succeeded but the provider did not
    /// report any connection for the new credential.
    #[error("the provider did not return a bank connection")]
    NoUpstreamConnection,

    /// An authorization request did not include the one-time code from the provider.
    #[error("the authorization code is missing")]
    MissingAuthorizationCode,

    /// A call to the bank-data provider failed.
    #[error("upstream error: {0}")]
    Upstream(#[from] ProviderError),

    /// A categorization rule set could not be loaded.
    #[error("invalid categorization rules: {0}")]
    InvalidRules(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, message) = match self {
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Error::MalformedRecord(_)
            | Error::InvalidRules(_)
            | Error::MissingAuthorizationCode => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Error::InvalidStatusTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            Error::NoUpstreamConnection => (StatusCode::BAD_GATEWAY, self.to_string()),
            Error::Upstream(ProviderError::Unauthorized) => (
                StatusCode::BAD_REQUEST,
                "The bank rejected the authorization, please reconnect.".to_owned(),
            ),
            Error::Upstream(ref error) => {
                tracing::error!("An upstream error occurred: {error}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The bank could not be reached, please try again later.".to_owned(),
                )
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details."
                        .to_owned(),
                )
            }
        };

        (status_code, Json(json!({ "error": message }))).into_response()
    }
}

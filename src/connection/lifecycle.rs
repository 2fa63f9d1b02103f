//! Linking a bank to a project and unlinking it again.

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    connection::core::{
        BankConnection, NewBankConnection, get_connection, soft_delete_connection,
        upsert_connection,
    },
    database_id::{ConnectionId, ProjectId, UserId},
    db::with_db,
    sync::{SyncOrchestrator, SyncReport},
};

/// The label used when the provider does not name the bank.
pub const DEFAULT_BANK_LABEL: &str = "Bank";

/// A connection created or re-linked by [ConnectionLifecycle::authorize] and
/// the result of its first synchronization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Authorization {
    /// The linked connection, as it was before the first synchronization.
    pub connection: BankConnection,
    /// The result of the first synchronization.
    pub sync: SyncReport,
}

/// Creates and removes bank connections.
#[derive(Debug, Clone)]
pub struct ConnectionLifecycle {
    orchestrator: SyncOrchestrator,
}

impl ConnectionLifecycle {
    /// Create a lifecycle that uses the database and provider of `orchestrator`.
    pub fn new(orchestrator: SyncOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Exchange the one-time `code` for a credential, link the resulting
    /// connection to the project and synchronize it once.
    ///
    /// Authorizing a bank that is already linked updates the existing
    /// connection in place and makes it active again.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Upstream] if the code exchange or connection listing fails,
    /// - [Error::NoUpstreamConnection] if the provider reports no connection
    ///   for the new credential,
    /// - or [Error::SqlError] if the connection cannot be stored.
    ///
    /// A failed first synchronization is not an error: it is reported in
    /// [Authorization::sync].
    pub async fn authorize(
        &self,
        code: &str,
        owner_user_id: UserId,
        owner_project_id: ProjectId,
    ) -> Result<Authorization, Error> {
        let provider = self.orchestrator.provider();

        let access_token = provider.exchange_code(code).await.inspect_err(|error| {
            tracing::error!("Could not exchange authorization code: {error}");
        })?;

        let upstream = provider
            .list_connections(&access_token)
            .await
            .inspect_err(|error| tracing::error!("Could not list new connections: {error}"))?
            .into_iter()
            .find(|upstream| upstream.id.is_some())
            .ok_or(Error::NoUpstreamConnection)?;

        let new_connection = NewBankConnection {
            owner_project_id,
            owner_user_id,
            external_id: upstream.id.unwrap_or_default(),
            access_token,
            bank_label: upstream
                .connector
                .and_then(|connector| connector.name)
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BANK_LABEL.to_owned()),
        };

        let connection = with_db(self.orchestrator.db_connection(), |connection| {
            upsert_connection(&new_connection, connection)
        })?;

        tracing::info!(
            connection_id = connection.id,
            external_id = %connection.external_id,
            owner_project_id,
            "Linked bank connection"
        );

        let sync = self.orchestrator.synchronize(connection.id).await;

        Ok(Authorization { connection, sync })
    }

    /// Revoke connection `connection_id` at the provider and delete it locally.
    ///
    /// The local deletion happens even if the provider cannot be reached or
    /// refuses the revocation. Disconnecting a deleted connection does not
    /// call the provider again.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `connection_id` does not refer to a valid connection,
    /// - or [Error::SqlError] there is some other SQL error.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<BankConnection, Error> {
        let db_connection = self.orchestrator.db_connection();
        let bank_connection =
            with_db(db_connection, |connection| get_connection(connection_id, connection))?;

        if bank_connection.deleted_at.is_some() {
            return Ok(bank_connection);
        }

        if let Err(error) = self
            .orchestrator
            .provider()
            .revoke_connection(&bank_connection.access_token, &bank_connection.external_id)
            .await
        {
            tracing::warn!(
                connection_id,
                "Could not revoke connection at the provider, deleting it locally anyway: {error}"
            );
        }

        let deleted_at = OffsetDateTime::now_utc();
        let bank_connection = with_db(db_connection, |connection| {
            soft_delete_connection(connection_id, deleted_at, connection)
        })?;

        tracing::info!(connection_id, "Disconnected bank connection");

        Ok(bank_connection)
    }
}

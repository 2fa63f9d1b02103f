//! Defines the core data models and database queries for bank connections.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{ConnectionId, ProjectId, UserId},
};

// ============================================================================
// MODELS
// ============================================================================

/// A link between a renovation project and an account grouping at the bank-data provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankConnection {
    /// The local ID of the connection.
    pub id: ConnectionId,
    /// The project the imported transactions belong to.
    pub owner_project_id: ProjectId,
    /// The user who authorized the connection.
    pub owner_user_id: UserId,
    /// The provider's ID for the connection.
    pub external_id: String,
    /// The credential used for calls to the provider.
    #[serde(skip_serializing)]
    pub access_token: String,
    /// The name of the bank, for display.
    pub bank_label: String,
    /// Whether the credential is believed to be valid.
    ///
    /// Once false, only a new authorization makes the connection active again.
    pub active: bool,
    /// When a synchronization last processed at least one account.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_synced_at: Option<OffsetDateTime>,
    /// When the user disconnected the bank, if they did.
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl BankConnection {
    /// Whether the connection may be synchronized, i.e. it is active and not deleted.
    pub fn is_syncable(&self) -> bool {
        self.active && self.deleted_at.is_none()
    }
}

/// The data needed to create or re-link a bank connection.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBankConnection {
    /// The project the imported transactions belong to.
    pub owner_project_id: ProjectId,
    /// The user who authorized the connection.
    pub owner_user_id: UserId,
    /// The provider's ID for the connection.
    pub external_id: String,
    /// The credential obtained from the code exchange.
    pub access_token: String,
    /// The name of the bank, for display.
    pub bank_label: String,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const SELECT_COLUMNS: &str = "id, owner_project_id, owner_user_id, external_id, access_token, \
     bank_label, active, last_synced_at, deleted_at";

/// Create the bank connection table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_connection_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS bank_connection (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_project_id INTEGER NOT NULL,
                owner_user_id INTEGER NOT NULL,
                external_id TEXT NOT NULL CHECK (length(trim(external_id)) > 0),
                access_token TEXT NOT NULL,
                bank_label TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                last_synced_at TEXT,
                deleted_at TEXT
                )",
        (),
    )?;

    // Deleted rows keep their external ID, so uniqueness only covers live rows.
    connection.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_bank_connection_live_external_id
         ON bank_connection(external_id) WHERE deleted_at IS NULL;",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_bank_connection_project
         ON bank_connection(owner_project_id);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [BankConnection].
pub fn map_connection_row(row: &Row) -> Result<BankConnection, rusqlite::Error> {
    Ok(BankConnection {
        id: row.get(0)?,
        owner_project_id: row.get(1)?,
        owner_user_id: row.get(2)?,
        external_id: row.get(3)?,
        access_token: row.get(4)?,
        bank_label: row.get(5)?,
        active: row.get(6)?,
        last_synced_at: row.get(7)?,
        deleted_at: row.get(8)?,
    })
}

/// Create a connection, or re-link the live connection with the same external ID.
///
/// Re-linking replaces the credential and bank label and makes the connection
/// active again. The owners and the last synchronization time are kept.
///
/// # Errors
/// This function will return a:
/// - [Error::MalformedRecord] if the external ID is blank,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn upsert_connection(
    new_connection: &NewBankConnection,
    connection: &Connection,
) -> Result<BankConnection, Error> {
    let external_id = new_connection.external_id.trim();
    if external_id.is_empty() {
        return Err(Error::MalformedRecord(
            "bank connection has no external ID".to_owned(),
        ));
    }

    connection
        .prepare(&format!(
            "INSERT INTO bank_connection
                (owner_project_id, owner_user_id, external_id, access_token, bank_label, active)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)
             ON CONFLICT(external_id) WHERE deleted_at IS NULL DO UPDATE SET
                 access_token = excluded.access_token,
                 bank_label = excluded.bank_label,
                 active = 1
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row(
            (
                new_connection.owner_project_id,
                new_connection.owner_user_id,
                external_id,
                &new_connection.access_token,
                &new_connection.bank_label,
            ),
            map_connection_row,
        )
        .map_err(Error::from)
}

/// Retrieve a connection by its local `id`, including deleted connections.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid connection,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_connection(id: ConnectionId, connection: &Connection) -> Result<BankConnection, Error> {
    let bank_connection = connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM bank_connection WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], map_connection_row)?;

    Ok(bank_connection)
}

/// List the connections of a project that have not been deleted.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn list_connections_for_project(
    project_id: ProjectId,
    connection: &Connection,
) -> Result<Vec<BankConnection>, Error> {
    connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM bank_connection
             WHERE owner_project_id = ?1 AND deleted_at IS NULL
             ORDER BY id ASC"
        ))?
        .query_map([project_id], map_connection_row)?
        .map(|maybe_connection| maybe_connection.map_err(Error::from))
        .collect()
}

/// List the IDs of every connection that may be synchronized.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn list_syncable_connection_ids(connection: &Connection) -> Result<Vec<ConnectionId>, Error> {
    connection
        .prepare(
            "SELECT id FROM bank_connection
             WHERE active = 1 AND deleted_at IS NULL
             ORDER BY id ASC",
        )?
        .query_map([], |row| row.get(0))?
        .map(|maybe_id| maybe_id.map_err(Error::from))
        .collect()
}

/// Record that a synchronization of connection `id` processed accounts at `synced_at`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid connection,
/// - or [Error::SqlError] there is some other SQL error.
pub fn set_last_synced(
    id: ConnectionId,
    synced_at: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE bank_connection SET last_synced_at = ?2 WHERE id = ?1",
        (id, synced_at),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Deactivate connection `id` and mark it as deleted at `deleted_at`.
///
/// Deleting an already deleted connection keeps the original deletion time.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid connection,
/// - or [Error::SqlError] there is some other SQL error.
pub fn soft_delete_connection(
    id: ConnectionId,
    deleted_at: OffsetDateTime,
    connection: &Connection,
) -> Result<BankConnection, Error> {
    let bank_connection = connection
        .prepare(&format!(
            "UPDATE bank_connection
             SET active = 0, deleted_at = COALESCE(deleted_at, ?2)
             WHERE id = ?1
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row((id, deleted_at), map_connection_row)?;

    Ok(bank_connection)
}

// ============================================================================
// TESTS
// ============================================================================

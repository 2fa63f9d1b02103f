//! Tracks whether the credential of a bank connection can still be used.

use rusqlite::Connection;

use crate::{Error, database_id::ConnectionId};

/// Deactivate connection `id` after the provider rejected its credential.
///
/// The credential is not used again until the user authorizes the bank
/// anew, which is the only path that reactivates a connection.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid connection,
/// - or [Error::SqlError] there is some other SQL error.
pub fn mark_unauthorized(id: ConnectionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE bank_connection SET active = 0 WHERE id = ?1",
        [id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::warn!(connection_id = id, "Bank connection needs to be reconnected");

    Ok(())
}

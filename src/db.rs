//! Database initialization and access to the shared SQLite connection.

use std::sync::Mutex;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error, bank_transaction::create_bank_transaction_table,
    connection::create_connection_table,
};

/// Create all the tables used by the application.
///
/// The tables are created inside a single transaction, so either all of them
/// exist afterwards or none of the changes are kept. Calling this function on
/// an initialized database does nothing.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_connection_table(&transaction)?;
    create_bank_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Run `f` with the database connection behind `db_connection`.
///
/// The lock is released when `f` returns, so callers must not hold on to
/// anything borrowed from the connection across an `.await`.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned, otherwise the
/// error returned by `f`.
pub fn with_db<T>(
    db_connection: &Mutex<Connection>,
    f: impl FnOnce(&Connection) -> Result<T, Error>,
) -> Result<T, Error> {
    let connection = db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    f(&connection)
}

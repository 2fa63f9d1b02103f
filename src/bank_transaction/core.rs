//! Defines the core data models and database queries for synchronized bank transactions.

use std::{fmt, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{ConnectionId, ExpenseId, TransactionId},
};

// ============================================================================
// MODELS
// ============================================================================

/// Where a bank transaction is in its review by the user.
///
/// `Converted` and `Ignored` are terminal: a transaction never goes back to `New`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Imported from the bank and not reviewed yet.
    New,
    /// Turned into an expense of the renovation budget.
    Converted,
    /// Dismissed by the user.
    Ignored,
}

impl TransactionStatus {
    /// The representation stored in the database and sent over the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::New => "NEW",
            TransactionStatus::Converted => "CONVERTED",
            TransactionStatus::Ignored => "IGNORED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(TransactionStatus::New),
            "CONVERTED" => Ok(TransactionStatus::Converted),
            "IGNORED" => Ok(TransactionStatus::Ignored),
            other => Err(format!("unknown transaction status \"{other}\"")),
        }
    }
}

impl ToSql for TransactionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: String| FromSqlError::Other(error.into()))
    }
}

/// A transaction pulled from a bank connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankTransaction {
    /// The local ID of the transaction.
    pub id: TransactionId,
    /// The connection the transaction was last synchronized through.
    pub connection_id: ConnectionId,
    /// The provider's stable ID, used to deduplicate re-synchronized transactions.
    pub external_id: String,
    /// The absolute amount of money that moved.
    pub amount: f64,
    /// A text description of the transaction.
    pub description: String,
    /// When the transaction was booked.
    pub occurred_at: Date,
    /// The provider's primary category code, if any.
    pub category: Option<String>,
    /// Provider details that are kept but not interpreted.
    pub metadata: serde_json::Value,
    /// The expense this transaction was converted into.
    pub linked_expense_id: Option<ExpenseId>,
    /// The review status.
    pub status: TransactionStatus,
}

/// A normalized transaction ready to be merged into the database.
///
/// Only the fields the provider owns are here: the status and linked expense
/// belong to the user and are never overwritten by a sync.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBankTransaction {
    /// The connection the transaction was fetched through.
    pub connection_id: ConnectionId,
    /// The provider's stable ID. Must not be blank.
    pub external_id: String,
    /// The amount of money that moved, stored as an absolute value.
    pub amount: f64,
    /// A text description of the transaction.
    pub description: String,
    /// When the transaction was booked.
    pub occurred_at: Date,
    /// The provider's primary category code, if any.
    pub category: Option<String>,
    /// Provider details that are kept but not interpreted.
    pub metadata: serde_json::Value,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub(crate) const SELECT_COLUMNS: &str = "id, connection_id, external_id, amount, description, \
     occurred_at, category, metadata, linked_expense_id, status";

/// Create the bank transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_bank_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS bank_transaction (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER NOT NULL,
                external_id TEXT NOT NULL UNIQUE CHECK (length(trim(external_id)) > 0),
                amount REAL NOT NULL,
                description TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                category TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                linked_expense_id INTEGER,
                status TEXT NOT NULL DEFAULT 'NEW' CHECK (status IN ('NEW', 'CONVERTED', 'IGNORED')),
                FOREIGN KEY(connection_id) REFERENCES bank_connection(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_bank_transaction_connection_date
         ON bank_transaction(connection_id, occurred_at);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [BankTransaction].
///
/// The row must contain the columns in [SELECT_COLUMNS] order.
pub fn map_bank_transaction_row(row: &Row) -> Result<BankTransaction, rusqlite::Error> {
    Ok(BankTransaction {
        id: row.get(0)?,
        connection_id: row.get(1)?,
        external_id: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        occurred_at: row.get(5)?,
        category: row.get(6)?,
        metadata: row.get(7)?,
        linked_expense_id: row.get(8)?,
        status: row.get(9)?,
    })
}

/// Retrieve a bank transaction by its local `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_bank_transaction(
    id: TransactionId,
    connection: &Connection,
) -> Result<BankTransaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM bank_transaction WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], map_bank_transaction_row)?;

    Ok(transaction)
}

/// List the transactions of a connection, newest first, optionally filtered by `status`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn list_bank_transactions(
    connection_id: ConnectionId,
    status: Option<TransactionStatus>,
    connection: &Connection,
) -> Result<Vec<BankTransaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM bank_transaction
             WHERE connection_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY occurred_at DESC, id DESC"
        ))?
        .query_map((connection_id, status), map_bank_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Get the total number of bank transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_bank_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM bank_transaction;", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

// ============================================================================
// TESTS
// ============================================================================

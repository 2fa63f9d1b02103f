//! Status transitions for bank transactions reviewed by the user.

use rusqlite::Connection;

use crate::{
    Error,
    bank_transaction::core::{
        BankTransaction, SELECT_COLUMNS, TransactionStatus, get_bank_transaction,
        map_bank_transaction_row,
    },
    database_id::{ExpenseId, TransactionId},
};

/// Mark a new transaction as converted into the expense `expense_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::InvalidStatusTransition] if the transaction is not new,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn convert_transaction(
    id: TransactionId,
    expense_id: ExpenseId,
    connection: &Connection,
) -> Result<BankTransaction, Error> {
    transition_from_new(id, TransactionStatus::Converted, Some(expense_id), connection)
}

/// Mark a new transaction as ignored.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::InvalidStatusTransition] if the transaction is not new,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn ignore_transaction(
    id: TransactionId,
    connection: &Connection,
) -> Result<BankTransaction, Error> {
    transition_from_new(id, TransactionStatus::Ignored, None, connection)
}

fn transition_from_new(
    id: TransactionId,
    to: TransactionStatus,
    linked_expense_id: Option<ExpenseId>,
    connection: &Connection,
) -> Result<BankTransaction, Error> {
    let maybe_transaction = connection
        .prepare(&format!(
            "UPDATE bank_transaction
             SET status = ?2, linked_expense_id = COALESCE(?3, linked_expense_id)
             WHERE id = ?1 AND status = 'NEW'
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row((id, to, linked_expense_id), map_bank_transaction_row);

    match maybe_transaction {
        Ok(transaction) => {
            tracing::debug!("Bank transaction {id} is now {to}");
            Ok(transaction)
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            // Either the transaction does not exist or it has already left NEW.
            let current = get_bank_transaction(id, connection)?;
            Err(Error::InvalidStatusTransition {
                from: current.status,
                to,
            })
        }
        Err(error) => Err(error.into()),
    }
}

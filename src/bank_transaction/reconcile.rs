//! Idempotent merging of fetched bank transactions into the database.

use rusqlite::Connection;

use crate::{
    Error,
    bank_transaction::core::{
        BankTransaction, NewBankTransaction, SELECT_COLUMNS, map_bank_transaction_row,
    },
};

/// Insert a transaction, or update it if its external ID is already stored.
///
/// This is a single conditional write, so concurrent syncs that overlap in
/// time cannot create duplicates. On conflict the provider-owned fields
/// (connection, amount, description, date, category, metadata) are
/// overwritten while the status and linked expense are left untouched.
///
/// **Note**: If you want transactional integrity for a batch (all or
/// nothing), pass in a transaction for `connection`.
///
/// # Errors
/// This function will return a:
/// - [Error::MalformedRecord] if the external ID is blank,
/// - or [Error::SqlError] if there is some other SQL error, e.g. the
///   connection ID does not refer to a stored connection.
pub fn upsert_transaction(
    transaction: &NewBankTransaction,
    connection: &Connection,
) -> Result<BankTransaction, Error> {
    let external_id = transaction.external_id.trim();
    if external_id.is_empty() {
        return Err(Error::MalformedRecord(
            "transaction has no external ID".to_owned(),
        ));
    }

    connection
        .prepare_cached(&format!(
            "INSERT INTO bank_transaction
                (connection_id, external_id, amount, description, occurred_at, category, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(external_id) DO UPDATE SET
                 connection_id = excluded.connection_id,
                 amount = excluded.amount,
                 description = excluded.description,
                 occurred_at = excluded.occurred_at,
                 category = excluded.category,
                 metadata = excluded.metadata
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row(
            (
                transaction.connection_id,
                external_id,
                transaction.amount.abs(),
                &transaction.description,
                transaction.occurred_at,
                &transaction.category,
                &transaction.metadata,
            ),
            map_bank_transaction_row,
        )
        .map_err(Error::from)
}

//! Bank transactions pulled from the provider and their review by the user.

mod core;
mod list_endpoint;
mod reconcile;
mod status;
mod status_endpoint;

#[cfg(test)]
pub use core::count_bank_transactions;
pub use core::{
    BankTransaction, NewBankTransaction, TransactionStatus, create_bank_transaction_table,
    get_bank_transaction, list_bank_transactions, map_bank_transaction_row,
};
pub use list_endpoint::{
    ListTransactionsQuery, TransactionListState, TransactionWithSuggestion,
    list_transactions_endpoint,
};
pub use reconcile::upsert_transaction;
pub use status::{convert_transaction, ignore_transaction};
pub use status_endpoint::{
    ConvertForm, TransactionStatusState, convert_transaction_endpoint, ignore_transaction_endpoint,
};

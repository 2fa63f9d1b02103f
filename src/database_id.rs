//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The local ID of a bank connection.
pub type ConnectionId = DatabaseId;
/// The local ID of a synchronized bank transaction.
pub type TransactionId = DatabaseId;
/// The ID of an expense a bank transaction was converted into.
pub type ExpenseId = DatabaseId;
/// The ID of the renovation project that owns a bank connection.
pub type ProjectId = DatabaseId;
/// The ID of the user that linked a bank connection.
pub type UserId = DatabaseId;

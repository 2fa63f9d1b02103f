//! Bank connections: storage, credential health and the link/unlink lifecycle.

mod authorize_endpoint;
mod core;
mod disconnect_endpoint;
mod lifecycle;
mod list_endpoint;
mod token_health;

pub use authorize_endpoint::{AuthorizeForm, authorize_endpoint};
pub use core::{
    BankConnection, NewBankConnection, create_connection_table, get_connection,
    list_connections_for_project, list_syncable_connection_ids, map_connection_row,
    set_last_synced, soft_delete_connection, upsert_connection,
};
pub use disconnect_endpoint::disconnect_endpoint;
pub use lifecycle::{Authorization, ConnectionLifecycle, DEFAULT_BANK_LABEL};
pub use list_endpoint::{ListConnectionsState, list_connections_endpoint};
pub use token_health::mark_unauthorized;

use rusqlite::Connection;
use serde_json::json;
use time::macros::date;

use crate::{
    bank_transaction::NewBankTransaction,
    connection::{BankConnection, NewBankConnection, upsert_connection},
    database_id::ConnectionId,
    initialize_db,
    provider::{UpstreamCategory, UpstreamTransaction},
};

/// The project every connection created by [insert_test_connection] belongs to.
pub(crate) const TEST_PROJECT_ID: i64 = 1;

pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
    initialize_db(&connection).expect("Could not initialise database");
    connection
}

#[track_caller]
pub(crate) fn insert_test_connection(external_id: &str, connection: &Connection) -> BankConnection {
    upsert_connection(
        &NewBankConnection {
            owner_project_id: TEST_PROJECT_ID,
            owner_user_id: 1,
            external_id: external_id.to_owned(),
            access_token: format!("token-{external_id}"),
            bank_label: "Crédit Agricole".to_owned(),
        },
        connection,
    )
    .expect("Could not insert test connection")
}

pub(crate) fn new_bank_transaction(
    connection_id: ConnectionId,
    external_id: &str,
) -> NewBankTransaction {
    NewBankTransaction {
        connection_id,
        external_id: external_id.to_owned(),
        amount: 42.5,
        description: "Leroy Merlin - achat carrelage".to_owned(),
        occurred_at: date!(2025 - 01 - 15),
        category: None,
        metadata: json!({"account_id": "a1", "value": -42.5}),
    }
}

pub(crate) fn upstream_transaction(id: &str, value: f64, wording: &str) -> UpstreamTransaction {
    UpstreamTransaction {
        id: Some(id.to_owned()),
        value: Some(value),
        wording: Some(wording.to_owned()),
        original_wording: Some(format!("CB {}", wording.to_uppercase())),
        simplified_wording: None,
        date: Some("2025-01-15".to_owned()),
        categories: vec![UpstreamCategory {
            code: Some("home_improvement".to_owned()),
        }],
    }
}

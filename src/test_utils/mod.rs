#![allow(missing_docs)]

pub(crate) mod fake_provider;
pub(crate) mod fixtures;
pub(crate) mod http;

pub(crate) use fake_provider::FakeProvider;
pub(crate) use fixtures::{
    get_test_connection, insert_test_connection, new_bank_transaction, upstream_transaction,
};
pub(crate) use http::{assert_content_type, parse_json_body};

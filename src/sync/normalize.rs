//! Turns provider transactions into records for the reconciliation store.

use serde_json::json;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error, bank_transaction::NewBankTransaction, database_id::ConnectionId,
    provider::UpstreamTransaction,
};

/// The description used when the provider sends no usable label.
pub const DEFAULT_DESCRIPTION: &str = "Bank transaction";

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

type DescriptionExtractor = fn(&UpstreamTransaction) -> Option<&str>;

/// Where to look for a description, in order of preference.
const DESCRIPTION_EXTRACTORS: [DescriptionExtractor; 3] =
    [wording, original_wording, simplified_wording];

fn wording(transaction: &UpstreamTransaction) -> Option<&str> {
    transaction.wording.as_deref()
}

fn original_wording(transaction: &UpstreamTransaction) -> Option<&str> {
    transaction.original_wording.as_deref()
}

fn simplified_wording(transaction: &UpstreamTransaction) -> Option<&str> {
    transaction.simplified_wording.as_deref()
}

/// Pick the first non-blank label of `transaction`.
pub fn extract_description(transaction: &UpstreamTransaction) -> String {
    DESCRIPTION_EXTRACTORS
        .iter()
        .filter_map(|extract| extract(transaction))
        .map(str::trim)
        .find(|description| !description.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_owned()
}

/// Normalize a transaction fetched for `account_id` through connection `connection_id`.
///
/// The amount is stored as an absolute value; the signed value is kept in
/// the metadata along with the account and the raw provider labels.
///
/// # Errors
/// Returns [Error::MalformedRecord] if the transaction has no ID, no value,
/// or no date in the `YYYY-MM-DD` format.
pub fn normalize_transaction(
    connection_id: ConnectionId,
    account_id: &str,
    transaction: &UpstreamTransaction,
) -> Result<NewBankTransaction, Error> {
    let external_id = transaction
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::MalformedRecord("transaction has no external ID".to_owned()))?;

    let value = transaction.value.ok_or_else(|| {
        Error::MalformedRecord(format!("transaction {external_id} has no value"))
    })?;

    let occurred_at = parse_date(transaction.date.as_deref()).ok_or_else(|| {
        Error::MalformedRecord(format!(
            "transaction {external_id} has an invalid date {:?}",
            transaction.date
        ))
    })?;

    let category_codes: Vec<&str> = transaction
        .categories
        .iter()
        .filter_map(|category| category.code.as_deref())
        .collect();

    Ok(NewBankTransaction {
        connection_id,
        external_id: external_id.to_owned(),
        amount: value.abs(),
        description: extract_description(transaction),
        occurred_at,
        category: category_codes.first().map(|code| (*code).to_owned()),
        metadata: json!({
            "account_id": account_id,
            "value": value,
            "original_wording": transaction.original_wording,
            "categories": category_codes,
        }),
    })
}

/// Parse the date part of `text`, ignoring any time that follows it.
fn parse_date(text: Option<&str>) -> Option<Date> {
    let date_part = text?.trim().get(..10)?;

    Date::parse(date_part, DATE_FORMAT).ok()
}

//! Wire types returned by the provider API.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The response to an authorization code exchange.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// The permanent access credential for the user's connections.
    pub access_token: String,
}

/// A bank connection as reported by the provider.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UpstreamConnection {
    /// The stable, provider-assigned connection ID.
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    /// The bank behind the connection.
    #[serde(default)]
    pub connector: Option<UpstreamConnector>,
    /// The sub-accounts (current account, savings, cards...) of the connection.
    #[serde(default)]
    pub accounts: Vec<UpstreamAccount>,
}

/// The bank a connection was made to.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UpstreamConnector {
    /// The display name of the bank.
    #[serde(default)]
    pub name: Option<String>,
}

/// A sub-account of a connection.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UpstreamAccount {
    /// The provider's ID for the account.
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    /// The display name of the account.
    #[serde(default)]
    pub name: Option<String>,
}

/// A transaction as reported by the provider, before normalization.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UpstreamTransaction {
    /// The stable, provider-assigned transaction ID.
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    /// The signed amount, negative for debits.
    #[serde(default)]
    pub value: Option<f64>,
    /// The cleaned-up label.
    #[serde(default)]
    pub wording: Option<String>,
    /// The raw label as sent by the bank.
    #[serde(default)]
    pub original_wording: Option<String>,
    /// A shortened label.
    #[serde(default)]
    pub simplified_wording: Option<String>,
    /// The booking date as `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// The provider's own categorization, most relevant first.
    #[serde(default)]
    pub categories: Vec<UpstreamCategory>,
}

/// A category the provider assigned to a transaction.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UpstreamCategory {
    /// The provider's category code.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListConnectionsResponse {
    #[serde(default)]
    pub connections: Vec<UpstreamConnection>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListTransactionsResponse {
    #[serde(default)]
    pub transactions: Vec<UpstreamTransaction>,
}

/// Accept IDs sent either as JSON strings or numbers.
///
/// Blank strings and any other JSON type become `None`, leaving the decision
/// of what to do with an ID-less record to the caller.
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;

    Ok(match value {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

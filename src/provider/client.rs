//! The HTTP client for the bank-data provider.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use time::Date;

use crate::{
    config::ProviderConfig,
    provider::{
        ProviderError,
        models::{
            ListConnectionsResponse, ListTransactionsResponse, TokenResponse, UpstreamConnection,
            UpstreamTransaction,
        },
    },
};

/// The parameters for listing the transactions of one sub-account.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    /// The provider's ID for the sub-account.
    pub account_id: String,
    /// The earliest booking date to include.
    pub min_date: Date,
    /// The latest booking date to include.
    pub max_date: Date,
    /// The maximum number of transactions to return.
    pub limit: u32,
}

/// The operations this app needs from a bank-data provider.
///
/// Every call is a single request with no retries; callers decide what to do
/// with a [ProviderError].
#[async_trait]
pub trait BankingProvider: Send + Sync {
    /// Exchange a one-time authorization code for an access credential.
    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError>;

    /// List the connections (with their sub-accounts) visible to `access_token`.
    async fn list_connections(
        &self,
        access_token: &str,
    ) -> Result<Vec<UpstreamConnection>, ProviderError>;

    /// List the transactions of one sub-account.
    async fn list_transactions(
        &self,
        access_token: &str,
        query: &TransactionQuery,
    ) -> Result<Vec<UpstreamTransaction>, ProviderError>;

    /// Revoke a connection so the provider stops sharing its data.
    async fn revoke_connection(
        &self,
        access_token: &str,
        connection_id: &str,
    ) -> Result<(), ProviderError>;
}

/// A [BankingProvider] backed by the provider's REST API.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    config: ProviderConfig,
}

impl ProviderClient {
    /// Create a client whose requests all time out after `config.timeout`.
    ///
    /// # Errors
    /// Returns [ProviderError::Unavailable] if the TLS backend cannot be initialised.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| ProviderError::Unavailable(error.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

#[async_trait]
impl BankingProvider for ProviderClient {
    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        tracing::info!("Exchanging authorization code for an access token");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(self.url("/token/access"))
            .form(&params)
            .send()
            .await
            .inspect_err(|error| {
                tracing::error!("Error occurred in request to the token API: {error}")
            })?;

        let token: TokenResponse = decode(response).await?;

        Ok(token.access_token)
    }

    async fn list_connections(
        &self,
        access_token: &str,
    ) -> Result<Vec<UpstreamConnection>, ProviderError> {
        tracing::debug!("Listing connections...");

        let response = self
            .client
            .get(self.url("/connections"))
            .bearer_auth(access_token)
            .query(&[("expand", "accounts,connector")])
            .send()
            .await
            .inspect_err(|error| {
                tracing::error!("Error occurred in request to the connections API: {error}")
            })?;

        decode::<ListConnectionsResponse>(response)
            .await
            .map(|response| response.connections)
    }

    async fn list_transactions(
        &self,
        access_token: &str,
        query: &TransactionQuery,
    ) -> Result<Vec<UpstreamTransaction>, ProviderError> {
        tracing::debug!(account_id = %query.account_id, "Listing transactions...");

        let limit = query.limit.to_string();
        let min_date = query.min_date.to_string();
        let max_date = query.max_date.to_string();

        let response = self
            .client
            .get(self.url(&format!("/accounts/{}/transactions", query.account_id)))
            .bearer_auth(access_token)
            .query(&[
                ("limit", limit.as_str()),
                ("min_date", min_date.as_str()),
                ("max_date", max_date.as_str()),
            ])
            .send()
            .await
            .inspect_err(|error| {
                tracing::error!(
                    account_id = %query.account_id,
                    "Error occurred in request to the transactions API: {error}"
                )
            })?;

        decode::<ListTransactionsResponse>(response)
            .await
            .map(|response| response.transactions)
    }

    async fn revoke_connection(
        &self,
        access_token: &str,
        connection_id: &str,
    ) -> Result<(), ProviderError> {
        tracing::info!(connection_id, "Revoking connection");

        let response = self
            .client
            .delete(self.url(&format!("/connections/{connection_id}")))
            .bearer_auth(access_token)
            .send()
            .await
            .inspect_err(|error| {
                tracing::error!("Error occurred in request to the connections API: {error}")
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProviderError::from_status(status))
        }
    }
}

/// Check the status of `response` and decode its JSON body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        tracing::debug!("Provider returned status {status}");
        return Err(ProviderError::from_status(status));
    }

    response.json::<T>().await.map_err(|error| {
        tracing::error!("Error occurred while deserialising provider response: {error}");
        ProviderError::from(error)
    })
}

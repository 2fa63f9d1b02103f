use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::provider::{
    BankingProvider, ProviderError, TransactionQuery, UpstreamAccount, UpstreamConnection,
    UpstreamConnector, UpstreamTransaction,
};

/// An in-process provider whose responses are scripted by the test.
///
/// Every trait call counts towards [FakeProvider::call_count]. Accounts with
/// no scripted transactions return an empty list.
#[derive(Default)]
pub(crate) struct FakeProvider {
    token: Option<String>,
    connections: Vec<UpstreamConnection>,
    transactions: HashMap<String, Result<Vec<UpstreamTransaction>, ProviderError>>,
    exchange_error: Option<ProviderError>,
    listing_error: Option<ProviderError>,
    revoke_error: Option<ProviderError>,
    gate: Option<Gate>,
    calls: AtomicUsize,
    revoked: Mutex<Vec<String>>,
}

/// Holds `list_connections` until the test opens it.
#[derive(Default)]
struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The credential returned for any authorization code.
    pub(crate) fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_owned());
        self
    }

    /// Report a connection with the given accounts. An empty account ID
    /// stands for an account the provider sent without an ID.
    pub(crate) fn with_connection(mut self, id: &str, bank: &str, account_ids: &[&str]) -> Self {
        self.connections.push(UpstreamConnection {
            id: Some(id.to_owned()),
            connector: Some(UpstreamConnector {
                name: Some(bank.to_owned()),
            }),
            accounts: account_ids
                .iter()
                .map(|account_id| UpstreamAccount {
                    id: Some((*account_id).to_owned()).filter(|id| !id.is_empty()),
                    name: None,
                })
                .collect(),
        });
        self
    }

    pub(crate) fn with_transactions(
        mut self,
        account_id: &str,
        transactions: Vec<UpstreamTransaction>,
    ) -> Self {
        self.transactions
            .insert(account_id.to_owned(), Ok(transactions));
        self
    }

    pub(crate) fn with_account_error(mut self, account_id: &str, error: ProviderError) -> Self {
        self.transactions.insert(account_id.to_owned(), Err(error));
        self
    }

    pub(crate) fn with_exchange_error(mut self, error: ProviderError) -> Self {
        self.exchange_error = Some(error);
        self
    }

    pub(crate) fn with_listing_error(mut self, error: ProviderError) -> Self {
        self.listing_error = Some(error);
        self
    }

    pub(crate) fn with_revoke_error(mut self, error: ProviderError) -> Self {
        self.revoke_error = Some(error);
        self
    }

    /// Make `list_connections` wait for [FakeProvider::open_gate].
    pub(crate) fn with_gate(mut self) -> Self {
        self.gate = Some(Gate::default());
        self
    }

    /// Wait until a call is held at the gate.
    pub(crate) async fn wait_until_entered(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notified().await;
        }
    }

    /// Let the call held at the gate continue.
    pub(crate) fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.release.notify_one();
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The external IDs of the connections revoked so far.
    pub(crate) fn revoked(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }

    fn count_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BankingProvider for FakeProvider {
    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        self.count_call();

        match &self.exchange_error {
            Some(error) => Err(error.clone()),
            None => Ok(self
                .token
                .clone()
                .unwrap_or_else(|| format!("token-for-{code}"))),
        }
    }

    async fn list_connections(
        &self,
        _access_token: &str,
    ) -> Result<Vec<UpstreamConnection>, ProviderError> {
        self.count_call();

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        match &self.listing_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.connections.clone()),
        }
    }

    async fn list_transactions(
        &self,
        _access_token: &str,
        query: &TransactionQuery,
    ) -> Result<Vec<UpstreamTransaction>, ProviderError> {
        self.count_call();

        self.transactions
            .get(&query.account_id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn revoke_connection(
        &self,
        _access_token: &str,
        connection_id: &str,
    ) -> Result<(), ProviderError> {
        self.count_call();

        if let Some(error) = &self.revoke_error {
            return Err(error.clone());
        }

        self.revoked.lock().unwrap().push(connection_id.to_owned());
        Ok(())
    }
}

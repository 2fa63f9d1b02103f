//! Pulls transactions for a bank connection and merges them into the database.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{
    bank_transaction::{NewBankTransaction, upsert_transaction},
    connection::{BankConnection, get_connection, mark_unauthorized, set_last_synced},
    database_id::ConnectionId,
    db::with_db,
    provider::{BankingProvider, ProviderError, TransactionQuery, UpstreamAccount},
    sync::{lock::SyncLocks, normalize::normalize_transaction},
};

/// How far back each synchronization looks for transactions.
///
/// Consecutive synchronizations overlap, which the reconciliation store
/// absorbs by deduplicating on the provider's transaction ID.
pub const LOOKBACK_DAYS: i64 = 365;

/// The largest page of transactions the provider returns.
pub const PAGE_SIZE: u32 = 1000;

/// The outcome of a synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// The synchronization ran, possibly with some accounts or records skipped.
    Ok,
    /// The provider rejected the credential and the connection was deactivated.
    TokenExpired,
    /// The connection cannot be synchronized or the provider could not be reached.
    Failed,
    /// Another synchronization of the same connection is running.
    AlreadySyncing,
}

/// What a synchronization did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// The connection that was synchronized.
    pub connection_id: ConnectionId,
    /// The overall outcome.
    pub status: SyncStatus,
    /// The number of accounts whose transactions were fetched.
    pub accounts_processed: usize,
    /// The number of transactions inserted or updated.
    pub transactions_written: usize,
    /// The number of transactions skipped because they could not be stored.
    pub transactions_dropped: usize,
    /// The number of accounts whose transactions could not be fetched.
    pub accounts_failed: usize,
}

impl SyncReport {
    fn empty(connection_id: ConnectionId, status: SyncStatus) -> Self {
        Self {
            connection_id,
            status,
            accounts_processed: 0,
            transactions_written: 0,
            transactions_dropped: 0,
            accounts_failed: 0,
        }
    }
}

/// The result of fetching the transactions of one account.
#[derive(Debug)]
enum AccountOutcome {
    Fetched {
        account_id: String,
        transactions: Vec<NewBankTransaction>,
        dropped: usize,
    },
    Failed,
    Unauthorized,
}

/// Synchronizes bank connections with the provider.
///
/// Clones share the same database connection, provider and locks, so a clone
/// can be moved into a spawned task.
#[derive(Clone)]
pub struct SyncOrchestrator {
    db_connection: Arc<Mutex<Connection>>,
    provider: Arc<dyn BankingProvider>,
    locks: SyncLocks,
}

impl SyncOrchestrator {
    /// Create an orchestrator that calls `provider` and writes to `db_connection`.
    pub fn new(db_connection: Arc<Mutex<Connection>>, provider: Arc<dyn BankingProvider>) -> Self {
        Self {
            db_connection,
            provider,
            locks: SyncLocks::new(),
        }
    }

    /// The database connection the orchestrator writes to.
    pub fn db_connection(&self) -> &Arc<Mutex<Connection>> {
        &self.db_connection
    }

    /// The provider the orchestrator pulls transactions from.
    pub fn provider(&self) -> &Arc<dyn BankingProvider> {
        &self.provider
    }

    /// The locks that keep synchronizations of the same connection apart.
    pub fn locks(&self) -> &SyncLocks {
        &self.locks
    }

    /// Fetch the last year of transactions of connection `connection_id` and
    /// merge them into the database.
    ///
    /// All accounts are fetched before anything is written, so a credential
    /// rejected part way through leaves the stored transactions untouched.
    /// An account that cannot be fetched is skipped without affecting the
    /// others, as is a transaction that cannot be stored.
    pub async fn synchronize(&self, connection_id: ConnectionId) -> SyncReport {
        let Some(_guard) = self.locks.try_acquire(connection_id) else {
            tracing::info!(connection_id, "Synchronization already in progress");
            return SyncReport::empty(connection_id, SyncStatus::AlreadySyncing);
        };

        let bank_connection = match with_db(&self.db_connection, |connection| {
            get_connection(connection_id, connection)
        }) {
            Ok(bank_connection) if bank_connection.is_syncable() => bank_connection,
            Ok(_) => {
                tracing::warn!(connection_id, "Skipping inactive or deleted connection");
                return SyncReport::empty(connection_id, SyncStatus::Failed);
            }
            Err(error) => {
                tracing::warn!(connection_id, "Could not load connection: {error}");
                return SyncReport::empty(connection_id, SyncStatus::Failed);
            }
        };

        let accounts = match self.fetch_accounts(&bank_connection).await {
            Ok(accounts) => accounts,
            Err(ProviderError::Unauthorized) => return self.expire(connection_id),
            Err(error) => {
                tracing::error!(connection_id, "Could not list accounts: {error}");
                return SyncReport::empty(connection_id, SyncStatus::Failed);
            }
        };

        let mut outcomes = Vec::with_capacity(accounts.len());
        for account in &accounts {
            let outcome = self.fetch_account(&bank_connection, account).await;
            if matches!(outcome, AccountOutcome::Unauthorized) {
                return self.expire(connection_id);
            }
            outcomes.push(outcome);
        }

        let report = match with_db(&self.db_connection, |connection| {
            Ok(reconcile(connection_id, outcomes, connection))
        }) {
            Ok(report) => report,
            Err(error) => {
                tracing::error!(connection_id, "Could not store transactions: {error}");
                return SyncReport::empty(connection_id, SyncStatus::Failed);
            }
        };

        if report.accounts_processed > 0 {
            let synced_at = OffsetDateTime::now_utc();
            if let Err(error) = with_db(&self.db_connection, |connection| {
                set_last_synced(connection_id, synced_at, connection)
            }) {
                tracing::error!(connection_id, "Could not record synchronization time: {error}");
            }
        }

        tracing::info!(
            connection_id,
            accounts_processed = report.accounts_processed,
            accounts_failed = report.accounts_failed,
            transactions_written = report.transactions_written,
            transactions_dropped = report.transactions_dropped,
            "Synchronization finished"
        );

        report
    }

    /// List the accounts of the provider's connection matching `bank_connection`.
    ///
    /// A connection the provider does not report yet has no accounts.
    async fn fetch_accounts(
        &self,
        bank_connection: &BankConnection,
    ) -> Result<Vec<UpstreamAccount>, ProviderError> {
        let upstream_connections = match self
            .provider
            .list_connections(&bank_connection.access_token)
            .await
        {
            Ok(upstream_connections) => upstream_connections,
            Err(ProviderError::NotFound) => Vec::new(),
            Err(error) => return Err(error),
        };

        let accounts = upstream_connections
            .into_iter()
            .find(|upstream| upstream.id.as_deref() == Some(bank_connection.external_id.as_str()))
            .map(|upstream| upstream.accounts)
            .unwrap_or_else(|| {
                tracing::info!(
                    connection_id = bank_connection.id,
                    external_id = %bank_connection.external_id,
                    "The provider does not report this connection yet"
                );
                Vec::new()
            });

        Ok(accounts)
    }

    async fn fetch_account(
        &self,
        bank_connection: &BankConnection,
        account: &UpstreamAccount,
    ) -> AccountOutcome {
        let connection_id = bank_connection.id;
        let Some(account_id) = account.id.clone() else {
            tracing::warn!(connection_id, "Skipping account without an ID");
            return AccountOutcome::Failed;
        };

        let max_date = OffsetDateTime::now_utc().date();
        let query = TransactionQuery {
            account_id: account_id.clone(),
            min_date: max_date - Duration::days(LOOKBACK_DAYS),
            max_date,
            limit: PAGE_SIZE,
        };

        let upstream_transactions = match self
            .provider
            .list_transactions(&bank_connection.access_token, &query)
            .await
        {
            Ok(upstream_transactions) => upstream_transactions,
            Err(ProviderError::NotFound) => Vec::new(),
            Err(ProviderError::Unauthorized) => return AccountOutcome::Unauthorized,
            Err(error) => {
                tracing::warn!(
                    connection_id,
                    account_id = %account_id,
                    "Could not fetch transactions: {error}"
                );
                return AccountOutcome::Failed;
            }
        };

        let mut transactions = Vec::with_capacity(upstream_transactions.len());
        let mut dropped = 0;
        for upstream in &upstream_transactions {
            match normalize_transaction(connection_id, &account_id, upstream) {
                Ok(transaction) => transactions.push(transaction),
                Err(error) => {
                    tracing::warn!(
                        connection_id,
                        account_id = %account_id,
                        "Dropping transaction: {error}"
                    );
                    dropped += 1;
                }
            }
        }

        AccountOutcome::Fetched {
            account_id,
            transactions,
            dropped,
        }
    }

    fn expire(&self, connection_id: ConnectionId) -> SyncReport {
        if let Err(error) = with_db(&self.db_connection, |connection| {
            mark_unauthorized(connection_id, connection)
        }) {
            tracing::error!(connection_id, "Could not deactivate connection: {error}");
        }

        SyncReport::empty(connection_id, SyncStatus::TokenExpired)
    }
}

/// Write the fetched transactions and tally the outcomes.
fn reconcile(
    connection_id: ConnectionId,
    outcomes: Vec<AccountOutcome>,
    connection: &Connection,
) -> SyncReport {
    outcomes.into_iter().fold(
        SyncReport::empty(connection_id, SyncStatus::Ok),
        |mut report, outcome| {
            match outcome {
                AccountOutcome::Fetched {
                    account_id,
                    transactions,
                    dropped,
                } => {
                    report.accounts_processed += 1;
                    report.transactions_dropped += dropped;

                    for transaction in &transactions {
                        match upsert_transaction(transaction, connection) {
                            Ok(_) => report.transactions_written += 1,
                            Err(error) => {
                                tracing::warn!(
                                    connection_id,
                                    account_id = %account_id,
                                    external_id = %transaction.external_id,
                                    "Could not store transaction: {error}"
                                );
                                report.transactions_dropped += 1;
                            }
                        }
                    }
                }
                AccountOutcome::Failed => report.accounts_failed += 1,
                // Unauthorized outcomes end the synchronization before reconciling.
                AccountOutcome::Unauthorized => {}
            }

            report
        },
    )
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod synchronize_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;

    use crate::{
        bank_transaction::{
            TransactionStatus, count_bank_transactions, ignore_transaction, list_bank_transactions,
        },
        connection::{get_connection, mark_unauthorized, soft_delete_connection},
        provider::ProviderError,
        sync::{SyncOrchestrator, SyncStatus},
        test_utils::{FakeProvider, get_test_connection, insert_test_connection, upstream_transaction},
    };

    fn orchestrator(conn: Connection, provider: FakeProvider) -> (SyncOrchestrator, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        let orchestrator = SyncOrchestrator::new(Arc::new(Mutex::new(conn)), provider.clone());

        (orchestrator, provider)
    }

    #[tokio::test]
    async fn writes_transactions_of_every_account() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new()
            .with_connection("42", "Crédit Agricole", &["a1", "a2"])
            .with_transactions(
                "a1",
                vec![
                    upstream_transaction("t1", -10.0, "Leroy Merlin"),
                    upstream_transaction("t2", -20.0, "Castorama"),
                ],
            )
            .with_transactions("a2", vec![upstream_transaction("t3", 30.0, "Virement")]);
        let (orchestrator, _) = orchestrator(conn, provider);

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::Ok);
        assert_eq!(report.accounts_processed, 2);
        assert_eq!(report.transactions_written, 3);
        assert_eq!(report.accounts_failed, 0);
        let conn = orchestrator.db_connection().lock().unwrap();
        assert_eq!(count_bank_transactions(&conn).unwrap(), 3);
        assert!(get_connection(bank.id, &conn).unwrap().last_synced_at.is_some());
    }

    #[tokio::test]
    async fn failing_account_does_not_stop_the_others() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new()
            .with_connection("42", "Crédit Agricole", &["A", "B"])
            .with_account_error("A", ProviderError::Unavailable("connection reset".to_owned()))
            .with_transactions(
                "B",
                vec![
                    upstream_transaction("t1", -10.0, "Leroy Merlin"),
                    upstream_transaction("t2", -20.0, "Castorama"),
                    upstream_transaction("t3", -30.0, "Brico Dépôt"),
                ],
            );
        let (orchestrator, _) = orchestrator(conn, provider);

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::Ok);
        assert_eq!(report.transactions_written, 3);
        assert_eq!(report.accounts_processed, 1);
        assert_eq!(report.accounts_failed, 1);
        let conn = orchestrator.db_connection().lock().unwrap();
        assert!(get_connection(bank.id, &conn).unwrap().last_synced_at.is_some());
    }

    #[tokio::test]
    async fn expired_token_deactivates_connection_without_writes() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new()
            .with_connection("42", "Crédit Agricole", &["a1"])
            .with_transactions("a1", vec![upstream_transaction("t1", -10.0, "Leroy Merlin")])
            .with_listing_error(ProviderError::Unauthorized);
        let (orchestrator, provider) = orchestrator(conn, provider);

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::TokenExpired);
        assert_eq!(report.transactions_written, 0);
        assert_eq!(provider.call_count(), 1);
        let conn = orchestrator.db_connection().lock().unwrap();
        assert_eq!(count_bank_transactions(&conn).unwrap(), 0);
        assert!(!get_connection(bank.id, &conn).unwrap().active);
    }

    #[tokio::test]
    async fn token_rejected_mid_sync_writes_nothing() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new()
            .with_connection("42", "Crédit Agricole", &["a1", "a2"])
            .with_transactions("a1", vec![upstream_transaction("t1", -10.0, "Leroy Merlin")])
            .with_account_error("a2", ProviderError::Unauthorized);
        let (orchestrator, _) = orchestrator(conn, provider);

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::TokenExpired);
        let conn = orchestrator.db_connection().lock().unwrap();
        assert_eq!(count_bank_transactions(&conn).unwrap(), 0);
        let stored = get_connection(bank.id, &conn).unwrap();
        assert!(!stored.active);
        assert_eq!(stored.last_synced_at, None);
    }

    #[tokio::test]
    async fn unreachable_provider_fails() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new()
            .with_listing_error(ProviderError::Unavailable("timed out".to_owned()));
        let (orchestrator, _) = orchestrator(conn, provider);

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::Failed);
        let conn = orchestrator.db_connection().lock().unwrap();
        let stored = get_connection(bank.id, &conn).unwrap();
        assert!(stored.active);
        assert_eq!(stored.last_synced_at, None);
    }

    #[tokio::test]
    async fn connection_not_yet_provisioned_is_a_no_op() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new().with_connection("other", "Boursorama", &["a1"]);
        let (orchestrator, _) = orchestrator(conn, provider);

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::Ok);
        assert_eq!(report.accounts_processed, 0);
        let conn = orchestrator.db_connection().lock().unwrap();
        assert_eq!(get_connection(bank.id, &conn).unwrap().last_synced_at, None);
    }

    #[tokio::test]
    async fn missing_transactions_count_as_empty_account() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new()
            .with_connection("42", "Crédit Agricole", &["a1"])
            .with_account_error("a1", ProviderError::NotFound);
        let (orchestrator, _) = orchestrator(conn, provider);

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::Ok);
        assert_eq!(report.accounts_processed, 1);
        assert_eq!(report.transactions_written, 0);
    }

    #[tokio::test]
    async fn malformed_transactions_are_dropped() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let mut no_id = upstream_transaction("ignored", -5.0, "Sans identifiant");
        no_id.id = None;
        let mut bad_date = upstream_transaction("t2", -5.0, "Date invalide");
        bad_date.date = Some("not a date".to_owned());
        let provider = FakeProvider::new()
            .with_connection("42", "Crédit Agricole", &["a1"])
            .with_transactions(
                "a1",
                vec![
                    no_id,
                    upstream_transaction("t1", -10.0, "Leroy Merlin"),
                    bad_date,
                ],
            );
        let (orchestrator, _) = orchestrator(conn, provider);

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::Ok);
        assert_eq!(report.transactions_written, 1);
        assert_eq!(report.transactions_dropped, 2);
    }

    #[tokio::test]
    async fn account_without_id_is_counted_as_failed() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new().with_connection("42", "Crédit Agricole", &["", "a1"]);
        let (orchestrator, _) = orchestrator(conn, provider);

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.accounts_failed, 1);
        assert_eq!(report.accounts_processed, 1);
    }

    #[tokio::test]
    async fn inactive_connection_fails_without_calling_provider() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        mark_unauthorized(bank.id, &conn).unwrap();
        let provider = FakeProvider::new().with_connection("42", "Crédit Agricole", &["a1"]);
        let (orchestrator, provider) = orchestrator(conn, provider);

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::Failed);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn deleted_connection_fails_without_calling_provider() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        soft_delete_connection(bank.id, time::OffsetDateTime::now_utc(), &conn).unwrap();
        let (orchestrator, provider) = orchestrator(conn, FakeProvider::new());

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::Failed);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_connection_fails() {
        let (orchestrator, provider) = orchestrator(get_test_connection(), FakeProvider::new());

        let report = orchestrator.synchronize(1234).await;

        assert_eq!(report.status, SyncStatus::Failed);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn resync_keeps_reviewed_status() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new()
            .with_connection("42", "Crédit Agricole", &["a1"])
            .with_transactions(
                "a1",
                vec![
                    upstream_transaction("t1", -10.0, "Leroy Merlin"),
                    upstream_transaction("t2", -20.0, "Castorama"),
                ],
            );
        let (orchestrator, _) = orchestrator(conn, provider);
        orchestrator.synchronize(bank.id).await;
        {
            let conn = orchestrator.db_connection().lock().unwrap();
            let stored = list_bank_transactions(bank.id, None, &conn).unwrap();
            ignore_transaction(stored[0].id, &conn).unwrap();
        }

        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.transactions_written, 2);
        let conn = orchestrator.db_connection().lock().unwrap();
        let ignored =
            list_bank_transactions(bank.id, Some(TransactionStatus::Ignored), &conn).unwrap();
        assert_eq!(ignored.len(), 1);
        assert_eq!(count_bank_transactions(&conn).unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_sync_of_same_connection_is_rejected() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new()
            .with_connection("42", "Crédit Agricole", &["a1"])
            .with_transactions("a1", vec![upstream_transaction("t1", -10.0, "Leroy Merlin")])
            .with_gate();
        let (orchestrator, provider) = orchestrator(conn, provider);

        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.synchronize(bank.id).await }
        });
        provider.wait_until_entered().await;

        let second = orchestrator.synchronize(bank.id).await;
        provider.open_gate();
        let first = first.await.unwrap();

        assert_eq!(second.status, SyncStatus::AlreadySyncing);
        assert_eq!(first.status, SyncStatus::Ok);
        assert_eq!(first.transactions_written, 1);
        let conn = orchestrator.db_connection().lock().unwrap();
        assert!(get_connection(bank.id, &conn).unwrap().active);
    }

    #[tokio::test]
    async fn lock_is_released_after_sync() {
        let conn = get_test_connection();
        let bank = insert_test_connection("42", &conn);
        let provider = FakeProvider::new().with_connection("42", "Crédit Agricole", &[]);
        let (orchestrator, _) = orchestrator(conn, provider);

        orchestrator.synchronize(bank.id).await;
        let report = orchestrator.synchronize(bank.id).await;

        assert_eq!(report.status, SyncStatus::Ok);
    }
}

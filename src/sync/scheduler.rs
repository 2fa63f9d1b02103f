//! Periodic synchronization of every active bank connection.

use std::time::Duration;

use tokio::task::JoinSet;

use crate::{
    connection::list_syncable_connection_ids,
    db::with_db,
    sync::orchestrator::{SyncOrchestrator, SyncReport},
};

/// Synchronize every active connection, each on its own task.
///
/// Returns once all synchronizations have finished. Connections whose task
/// panicked are logged and left out of the reports.
pub async fn sync_all_connections(orchestrator: &SyncOrchestrator) -> Vec<SyncReport> {
    let connection_ids = match with_db(orchestrator.db_connection(), list_syncable_connection_ids)
    {
        Ok(connection_ids) => connection_ids,
        Err(error) => {
            tracing::error!("Could not list connections to synchronize: {error}");
            return Vec::new();
        }
    };

    tracing::info!("Found {} connections to synchronize", connection_ids.len());

    let mut tasks = JoinSet::new();
    for connection_id in connection_ids {
        let orchestrator = orchestrator.clone();
        tasks.spawn(async move { orchestrator.synchronize(connection_id).await });
    }

    let mut reports = Vec::with_capacity(tasks.len());
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(report) => reports.push(report),
            Err(error) => tracing::error!("A synchronization task failed: {error}"),
        }
    }

    reports
}

/// Synchronize every active connection each `interval`, forever.
///
/// The first round starts immediately. A round waits for all of its
/// synchronizations before the next one can start.
pub async fn sync_task(orchestrator: SyncOrchestrator, interval: Duration) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        tracing::info!("Running sync_task...");

        let reports = sync_all_connections(&orchestrator).await;

        for report in &reports {
            tracing::debug!(
                connection_id = report.connection_id,
                status = ?report.status,
                transactions_written = report.transactions_written,
                "Scheduled synchronization result"
            );
        }
    }
}

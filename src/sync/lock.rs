//! At most one in-flight synchronization per bank connection.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use crate::database_id::ConnectionId;

/// The set of connections that are currently being synchronized.
///
/// Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct SyncLocks {
    in_flight: Arc<Mutex<HashSet<ConnectionId>>>,
}

impl SyncLocks {
    /// Create an empty set of locks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `connection_id`, or return `None` if a synchronization of it is
    /// already running.
    ///
    /// The claim lasts until the returned guard is dropped.
    pub fn try_acquire(&self, connection_id: ConnectionId) -> Option<SyncGuard> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !in_flight.insert(connection_id) {
            return None;
        }

        Some(SyncGuard {
            in_flight: self.in_flight.clone(),
            connection_id,
        })
    }

    /// Whether a synchronization of `connection_id` is running.
    pub fn is_syncing(&self, connection_id: ConnectionId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&connection_id)
    }
}

/// Releases the claim on a connection when dropped, including when the
/// synchronization panics or its future is cancelled.
#[derive(Debug)]
pub struct SyncGuard {
    in_flight: Arc<Mutex<HashSet<ConnectionId>>>,
    connection_id: ConnectionId,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.connection_id);
    }
}

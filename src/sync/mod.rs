//! Synchronization of bank connections with the provider.

mod lock;
mod normalize;
mod orchestrator;
mod scheduler;
mod sync_endpoint;

pub use lock::{SyncGuard, SyncLocks};
pub use normalize::{DEFAULT_DESCRIPTION, extract_description, normalize_transaction};
pub use orchestrator::{LOOKBACK_DAYS, PAGE_SIZE, SyncOrchestrator, SyncReport, SyncStatus};
pub use scheduler::{sync_all_connections, sync_task};
pub use sync_endpoint::sync_endpoint;

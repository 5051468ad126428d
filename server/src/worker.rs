//! Single consumer of the update queue.

use crate::metrics_defs::{SYNC_FAILURES, SYNC_SUCCESSES};
use crate::queue::UpdateReceiver;
use resolver::store::RepositoryStore;
use shared::counter;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Spawn the sync worker. It pulls one branch at a time in queue order;
/// a failed pull is logged and the loop keeps draining. The task ends when
/// the queue closes, so joining the handle after dropping all producers
/// gives a clean shutdown.
pub fn spawn(mut updates: UpdateReceiver, store: Arc<dyn RepositoryStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(branch) = updates.recv().await {
            tracing::info!(branch = %branch, "pulling latest configuration");
            match store.pull(&branch).await {
                Ok(()) => {
                    counter!(SYNC_SUCCESSES).increment(1);
                    tracing::info!(branch = %branch, "repository updated");
                }
                Err(err) => {
                    counter!(SYNC_FAILURES).increment(1);
                    tracing::error!(branch = %branch, error = %err, "repository update failed");
                }
            }
        }
        tracing::debug!("update queue closed, sync worker exiting");
    })
}

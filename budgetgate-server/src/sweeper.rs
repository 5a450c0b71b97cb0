//! Background reclamation of expired tokens.
//!
//! The sweeper only frees memory. Expiry is enforced on lookup, so a token
//! past its TTL is dead whether or not a sweep has run.

use std::sync::Arc;
use std::time::Duration;

use budgetgate_core::TokenStore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawn a task that calls [`TokenStore::purge_expired`] every `interval`
/// until `shutdown` is cancelled.
pub fn spawn_sweeper(
    store: Arc<TokenStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tick.tick().await; // Skip immediate first tick
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let removed = store.purge_expired();
                    debug!(removed, remaining = store.len(), "Token sweep complete");
                }
                _ = shutdown.cancelled() => {
                    debug!("Token sweeper shutting down");
                    break;
                }
            }
        }
    })
}

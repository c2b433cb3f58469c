//! Background expiry sweeper.
//!
//! Lookups already treat expired sessions as gone, so the sweeper only
//! bounds memory and makes sure sockets on expired sessions are told and
//! closed even if nobody touches the code again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::PairingRegistry;

/// Spawns a task that sweeps `registry` every `interval`.
///
/// The task runs until aborted. A zero interval is clamped to one second.
#[must_use]
pub fn spawn_sweeper(registry: Arc<PairingRegistry>, interval: Duration) -> JoinHandle<()> {
    let period = if interval.is_zero() {
        Duration::from_secs(1)
    } else {
        interval
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = registry.sweep().await;
            if report.is_empty() {
                tracing::trace!("sweep tick");
            } else {
                tracing::info!(
                    expired = report.expired,
                    abandoned = report.abandoned,
                    disconnected = report.disconnected,
                    tombstones_pruned = report.tombstones_pruned,
                    "sweep completed"
                );
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Metadata, RegistryPolicy};
    use crate::error::RelayError;

    #[tokio::test]
    async fn evicts_expired_sessions_in_background() {
        let registry = Arc::new(PairingRegistry::with_policy(RegistryPolicy {
            min_ttl_secs: 1,
            ..RegistryPolicy::default()
        }));
        let Ok(ticket) = registry.create(Some(1), Metadata::new()).await else {
            panic!("create failed");
        };
        let handle = spawn_sweeper(Arc::clone(&registry), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(1_300)).await;
        handle.abort();

        assert!(registry.is_empty().await);
        let code = ticket.code.to_string();
        assert!(matches!(
            registry.get(&code).await,
            Err(RelayError::Expired(_))
        ));
    }

    #[tokio::test]
    async fn live_sessions_survive_ticks() {
        let registry = Arc::new(PairingRegistry::new());
        let Ok(ticket) = registry.create(None, Metadata::new()).await else {
            panic!("create failed");
        };
        let handle = spawn_sweeper(Arc::clone(&registry), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        // A never-joined session is not abandoned; it lives until its TTL.
        assert!(registry.get(&ticket.code.to_string()).await.is_ok());
    }
}

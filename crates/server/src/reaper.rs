//! Background removal of abandoned definition dialogs.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use services::services::store::{CommandStore, StoreError};
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

/// Removes pending definitions last touched more than `ttl` ago.
pub async fn sweep(store: &dyn CommandStore, ttl: chrono::Duration) -> Result<u64, StoreError> {
    // no dialog predates the epoch, so a cutoff before it has nothing to remove
    let cutoff = match Utc::now().checked_sub_signed(ttl) {
        Some(cutoff) if cutoff > DateTime::<Utc>::UNIX_EPOCH => cutoff,
        _ => return Ok(0),
    };
    store.remove_stale_pending_definitions(cutoff).await
}

/// Runs `sweep` every `every`, starting right away.
pub fn spawn(
    store: Arc<dyn CommandStore>,
    ttl: chrono::Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match sweep(store.as_ref(), ttl).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Removed stale pending definitions"),
                Err(e) => tracing::error!(error = %e, "Failed to remove stale pending definitions"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use db::{DBService, models::pending_definition::PendingDefinition};
    use services::services::store::SqliteCommandStore;

    use super::*;

    #[tokio::test]
    async fn test_sweep_removes_only_stale() {
        let store = SqliteCommandStore::new(DBService::new_in_memory().await.unwrap());

        let mut stale = PendingDefinition::new(1, 1, String::new(), String::new());
        stale.last_update = Utc::now() - chrono::Duration::hours(25);
        store.save_pending_definition(&stale).await.unwrap();

        let fresh = PendingDefinition::new(1, 2, String::new(), "hi".to_string());
        store.save_pending_definition(&fresh).await.unwrap();

        assert_eq!(sweep(&store, chrono::Duration::hours(24)).await.unwrap(), 1);
        assert!(store.find_pending_definition(1, 1).await.unwrap().is_none());
        assert!(store.find_pending_definition(1, 2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_with_huge_ttl_keeps_everything() {
        let store = SqliteCommandStore::new(DBService::new_in_memory().await.unwrap());
        let mut old = PendingDefinition::new(1, 1, String::new(), String::new());
        old.last_update = Utc::now() - chrono::Duration::days(3650);
        store.save_pending_definition(&old).await.unwrap();

        assert_eq!(sweep(&store, chrono::Duration::MAX).await.unwrap(), 0);
        let centuries = chrono::Duration::days(365 * 3000);
        assert_eq!(sweep(&store, centuries).await.unwrap(), 0);
        assert!(store.find_pending_definition(1, 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_spawned_reaper_sweeps_immediately() {
        let db = DBService::new_in_memory().await.unwrap();
        let store = Arc::new(SqliteCommandStore::new(db));
        let mut stale = PendingDefinition::new(1, 1, String::new(), String::new());
        stale.last_update = Utc::now() - chrono::Duration::hours(2);
        store.save_pending_definition(&stale).await.unwrap();

        let every = Duration::from_secs(3600);
        let handle = spawn(store.clone(), chrono::Duration::hours(1), every);
        for _ in 0..50 {
            if store.find_pending_definition(1, 1).await.unwrap().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();
        assert!(store.find_pending_definition(1, 1).await.unwrap().is_none());
    }
}

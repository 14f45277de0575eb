//! Persistence seam for commands, packs and pending definitions.
//!
//! `Ok(None)` is the not-found outcome; every `Err` is a persistence failure
//! that aborts handling of the current message.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::{
    DBService,
    models::{command::Command, pack::Pack, pending_definition::PendingDefinition},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Storage used by the dialog and the resolver.
///
/// Calls are independent; nothing here spans a transaction.
#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Command at `(pack, name, arity)`, else the one at `("", name, arity)`.
    async fn find(&self, pack: &str, name: &str, arity: u32) -> Result<Option<Command>, StoreError>;

    /// Replace-or-insert keyed by `(pack, name, arity)`.
    async fn upsert(&self, command: &Command) -> Result<(), StoreError>;

    /// Name of the pack the chat uses by default.
    async fn find_default_pack(&self, chat_id: i64) -> Result<Option<String>, StoreError>;

    async fn find_pending_definition(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<Option<PendingDefinition>, StoreError>;

    async fn save_pending_definition(&self, pending: &PendingDefinition) -> Result<(), StoreError>;

    async fn remove_pending_definition(&self, chat_id: i64, user_id: i64) -> Result<(), StoreError>;

    /// Removes dialogs whose `last_update` is before `cutoff`.
    async fn remove_stale_pending_definitions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

/// `CommandStore` over the SQLite models.
#[derive(Clone)]
pub struct SqliteCommandStore {
    db: DBService,
}

impl SqliteCommandStore {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }
}

#[async_trait]
impl CommandStore for SqliteCommandStore {
    async fn find(
        &self,
        pack: &str,
        name: &str,
        arity: u32,
    ) -> Result<Option<Command>, StoreError> {
        Ok(Command::find(&self.db.pool, pack, name, arity).await?)
    }

    async fn upsert(&self, command: &Command) -> Result<(), StoreError> {
        Ok(Command::upsert(&self.db.pool, command).await?)
    }

    async fn find_default_pack(&self, chat_id: i64) -> Result<Option<String>, StoreError> {
        let pack = Pack::find_by_chat(&self.db.pool, chat_id).await?;
        Ok(pack.map(|p| p.name))
    }

    async fn find_pending_definition(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<Option<PendingDefinition>, StoreError> {
        Ok(PendingDefinition::find(&self.db.pool, chat_id, user_id).await?)
    }

    async fn save_pending_definition(&self, pending: &PendingDefinition) -> Result<(), StoreError> {
        Ok(PendingDefinition::save(&self.db.pool, pending).await?)
    }

    async fn remove_pending_definition(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<(), StoreError> {
        PendingDefinition::remove(&self.db.pool, chat_id, user_id).await?;
        Ok(())
    }

    async fn remove_stale_pending_definitions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(PendingDefinition::remove_stale(&self.db.pool, cutoff).await?)
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;
    use db::models::command::CommandKind;

    use super::{test_support::sqlite_store, *};

    fn hi(pack: &str, template: &str) -> Command {
        Command {
            pack: pack.to_string(),
            name: "hi".to_string(),
            arity: 0,
            kind: CommandKind::Text,
            template: template.to_string(),
            creator: "@alice".to_string(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_pack_fallback_and_scoped_preference() {
        let store = sqlite_store().await;
        store.upsert(&hi("", "default")).await.unwrap();

        let found = store.find("team", "hi", 0).await.unwrap().unwrap();
        assert_eq!(found.template, "default");

        store.upsert(&hi("team", "team")).await.unwrap();
        let found = store.find("team", "hi", 0).await.unwrap().unwrap();
        assert_eq!(found.template, "team");
    }

    #[tokio::test]
    async fn test_default_pack_lookup() {
        let store = sqlite_store().await;
        assert_eq!(store.find_default_pack(7).await.unwrap(), None);

        Pack::ensure(&store.db().pool, "team").await.unwrap();
        Pack::bind_chat(&store.db().pool, "team", 7).await.unwrap();
        assert_eq!(store.find_default_pack(7).await.unwrap(), Some("team".to_string()));
    }

    #[tokio::test]
    async fn test_pending_definition_lifecycle() {
        let store = sqlite_store().await;
        let pending = PendingDefinition::new(1, 2, String::new(), String::new());
        store.save_pending_definition(&pending).await.unwrap();
        assert!(store.find_pending_definition(1, 2).await.unwrap().is_some());

        store.remove_pending_definition(1, 2).await.unwrap();
        assert!(store.find_pending_definition(1, 2).await.unwrap().is_none());

        // removing twice is fine
        store.remove_pending_definition(1, 2).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_stale_pending_definitions() {
        let store = sqlite_store().await;
        let mut stale = PendingDefinition::new(1, 2, String::new(), String::new());
        stale.last_update = Utc::now() - Duration::hours(30);
        store.save_pending_definition(&stale).await.unwrap();

        let removed = store
            .remove_stale_pending_definitions(Utc::now() - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}

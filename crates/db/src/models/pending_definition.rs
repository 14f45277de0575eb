use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

/// An uncommitted "define command" conversation, one per (chat, user).
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PendingDefinition {
    pub chat_id: i64,
    pub user_id: i64,
    /// empty for the default pack, or while `pack_resolved` is false
    pub pack: String,
    /// false until a pack was written or taken from the chat's default
    pub pack_resolved: bool,
    /// empty while still waiting for a name
    pub name: String,
    pub awaiting_content: bool,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl PendingDefinition {
    pub fn new(chat_id: i64, user_id: i64, pack: String, name: String) -> Self {
        let now = Utc::now();
        let awaiting_content = !name.is_empty();
        Self {
            chat_id,
            user_id,
            pack,
            pack_resolved: true,
            name,
            awaiting_content,
            created_at: now,
            last_update: now,
        }
    }

    /// A dialog waiting for a name whose pack is decided by that name.
    pub fn unresolved(chat_id: i64, user_id: i64) -> Self {
        Self {
            pack_resolved: false,
            ..Self::new(chat_id, user_id, String::new(), String::new())
        }
    }

    /// Refreshes `last_update` after the dialog moved forward.
    pub fn touch(&mut self) {
        self.last_update = Utc::now();
    }

    pub async fn find(
        pool: &SqlitePool,
        chat_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PendingDefinition>(
            r#"SELECT chat_id, user_id, pack, pack_resolved, name, awaiting_content,
                      created_at, last_update
               FROM pending_definitions
               WHERE chat_id = $1 AND user_id = $2"#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Inserts or replaces the dialog for its (chat, user), keeping the original `created_at`.
    pub async fn save(pool: &SqlitePool, pending: &PendingDefinition) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO pending_definitions
                   (chat_id, user_id, pack, pack_resolved, name, awaiting_content,
                    created_at, last_update)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (chat_id, user_id) DO UPDATE SET
                   pack = excluded.pack,
                   pack_resolved = excluded.pack_resolved,
                   name = excluded.name,
                   awaiting_content = excluded.awaiting_content,
                   last_update = excluded.last_update"#,
        )
        .bind(pending.chat_id)
        .bind(pending.user_id)
        .bind(&pending.pack)
        .bind(pending.pack_resolved)
        .bind(&pending.name)
        .bind(pending.awaiting_content)
        .bind(pending.created_at)
        .bind(pending.last_update)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn remove(pool: &SqlitePool, chat_id: i64, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM pending_definitions WHERE chat_id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Drops dialogs untouched since `cutoff`, returning how many were removed.
    pub async fn remove_stale(
        pool: &SqlitePool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pending_definitions WHERE last_update < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

/// A command namespace, used by its bound chats as their implicit default.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Pack {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Pack {
    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pack>("SELECT name, created_at FROM packs WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// The pack a chat uses when a reference names none.
    pub async fn find_by_chat(
        pool: &SqlitePool,
        chat_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pack>(
            r#"SELECT p.name, p.created_at
               FROM packs p
               INNER JOIN pack_chats pc ON pc.pack_name = p.name
               WHERE pc.chat_id = $1"#,
        )
        .bind(chat_id)
        .fetch_optional(pool)
        .await
    }

    /// Creates the pack unless it already exists, returning the stored row.
    pub async fn ensure(pool: &SqlitePool, name: &str) -> Result<Self, sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO packs (name, created_at) VALUES ($1, $2)")
            .bind(name)
            .bind(Utc::now())
            .execute(pool)
            .await?;

        Self::find_by_name(pool, name)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Makes this pack the chat's default, replacing any previous binding.
    pub async fn bind_chat(pool: &SqlitePool, name: &str, chat_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO pack_chats (chat_id, pack_name) VALUES ($1, $2)
               ON CONFLICT (chat_id) DO UPDATE SET pack_name = excluded.pack_name"#,
        )
        .bind(chat_id)
        .bind(name)
        .execute(pool)
        .await?;
        Ok(())
    }
}

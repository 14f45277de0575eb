use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use strum_macros::Display;

/// What a command replies with when invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::Type, Display)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CommandKind {
    /// template text, possibly with placeholders
    #[default]
    Text,
    /// the template is a sticker token sent back as-is
    Sticker,
}

/// A stored macro addressed by `(pack, name, arity)`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Command {
    /// empty string is the default pack
    pub pack: String,
    pub name: String,
    pub arity: u32,
    pub kind: CommandKind,
    pub template: String,
    pub creator: String,
    pub updated_at: DateTime<Utc>,
}

impl Command {
    /// `<pack>.<name>`, spelling the empty pack as `default` so the result can be typed back.
    pub fn full_name(&self) -> String {
        let pack = if self.pack.is_empty() {
            "default"
        } else {
            self.pack.as_str()
        };
        format!("{}.{}", pack, self.name)
    }

    /// Finds the command for `(pack, name, arity)`, falling back to the default pack.
    ///
    /// Both keys are searched in one query; a row in `pack` sorts ahead of the
    /// default-pack row, so the explicitly scoped command wins when both exist.
    pub async fn find(
        pool: &SqlitePool,
        pack: &str,
        name: &str,
        arity: u32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Command>(
            r#"SELECT pack, name, arity, kind, template, creator, updated_at
               FROM commands
               WHERE name = $1 AND arity = $2 AND (pack = $3 OR pack = '')
               ORDER BY pack DESC
               LIMIT 1"#,
        )
        .bind(name)
        .bind(arity)
        .bind(pack)
        .fetch_optional(pool)
        .await
    }

    /// Inserts the command or replaces the one sharing its `(pack, name, arity)` key.
    pub async fn upsert(pool: &SqlitePool, command: &Command) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO commands (pack, name, arity, kind, template, creator, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (pack, name, arity) DO UPDATE SET
                   kind = excluded.kind,
                   template = excluded.template,
                   creator = excluded.creator,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&command.pack)
        .bind(&command.name)
        .bind(command.arity)
        .bind(command.kind)
        .bind(&command.template)
        .bind(&command.creator)
        .bind(command.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}

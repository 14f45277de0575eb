use std::sync::Arc;

use db::models::command::{Command, CommandKind};
use thiserror::Error;

use super::{
    reference::Reference,
    store::{CommandStore, StoreError},
    verbs::{Segment, segments},
};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No command {pack}.{name} with {arity} parameters")]
    NotFound {
        pack: String,
        name: String,
        arity: u32,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The output of an invoked command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Text(String),
    Sticker(String),
}

/// The pack a reference points at: the written one, else the chat's default,
/// else the default pack.
pub async fn resolve_pack(
    store: &dyn CommandStore,
    reference: &Reference,
    chat_id: i64,
) -> Result<String, StoreError> {
    if reference.explicit_pack {
        return Ok(reference.pack.clone());
    }
    Ok(store.find_default_pack(chat_id).await?.unwrap_or_default())
}

/// Fills the placeholders of a normalized template.
///
/// `%[k]s` takes `arguments[k - 1]`, each `%s` takes the next argument not yet
/// taken by a `%s`, and `%%` becomes `%`. Nothing in an argument is interpreted.
pub fn substitute(template: &str, arguments: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut next = 0;

    for segment in segments(template) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Percent => out.push('%'),
            Segment::Next => {
                match arguments.get(next) {
                    Some(argument) => out.push_str(argument),
                    None => out.push_str("%s"),
                }
                next += 1;
            }
            Segment::Indexed(index) => match arguments.get(index as usize - 1) {
                Some(argument) => out.push_str(argument),
                None => {
                    out.push_str("%[");
                    out.push_str(&index.to_string());
                    out.push_str("]s");
                }
            },
        }
    }

    out
}

pub struct CommandResolver {
    store: Arc<dyn CommandStore>,
}

impl CommandResolver {
    pub fn new(store: Arc<dyn CommandStore>) -> Self {
        Self { store }
    }

    /// Finds the command `reference` names, for its number of arguments.
    pub async fn find(&self, reference: &Reference, chat_id: i64) -> Result<Command, ResolveError> {
        let pack = resolve_pack(self.store.as_ref(), reference, chat_id).await?;
        let arity = reference.arity();

        match self.store.find(&pack, &reference.name, arity).await? {
            Some(command) => Ok(command),
            None => Err(ResolveError::NotFound {
                pack,
                name: reference.name.clone(),
                arity,
            }),
        }
    }

    /// Looks the command up and fills it with the reference's arguments.
    pub async fn resolve(
        &self,
        reference: &Reference,
        chat_id: i64,
    ) -> Result<Rendered, ResolveError> {
        let command = self.find(reference, chat_id).await?;
        tracing::debug!(
            command = %command.full_name(),
            arity = command.arity,
            "Resolved command"
        );

        Ok(match command.kind {
            CommandKind::Sticker => Rendered::Sticker(command.template),
            CommandKind::Text if command.arity == 0 => Rendered::Text(command.template),
            CommandKind::Text => {
                Rendered::Text(substitute(&command.template, &reference.arguments))
            }
        })
    }
}

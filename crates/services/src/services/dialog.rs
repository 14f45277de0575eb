//! The multi-message "define command" conversation.
//!
//! The conversation for a (chat, user) lives only in its `PendingDefinition`
//! row; every step reads it from the store, moves it forward and writes it back.
//!
//! ```text
//! Idle --define, no name--> WaitingName --name--> WaitingContent --content--> Idle
//!   \--define, name, no content-------------------^                          ^
//!    \--define, name and content (nothing stored in between)-----------------/
//! ```

use std::sync::Arc;

use chrono::Utc;
use db::models::{
    command::{Command, CommandKind},
    pending_definition::PendingDefinition,
};

use super::{
    chat::{Content, InboundMessage},
    config::BotConfig,
    reference::{self, Reference},
    resolver::resolve_pack,
    store::{CommandStore, StoreError},
    verbs,
};

/// Where a (chat, user) conversation stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState {
    Idle,
    /// `pack` is `None` until written or taken from the chat's default
    WaitingName { pack: Option<String> },
    WaitingContent { pack: String, name: String },
}

impl DialogState {
    pub fn of(pending: Option<&PendingDefinition>) -> Self {
        match pending {
            None => DialogState::Idle,
            Some(p) if p.name.is_empty() => DialogState::WaitingName {
                pack: p.pack_resolved.then(|| p.pack.clone()),
            },
            Some(p) => DialogState::WaitingContent {
                pack: p.pack.clone(),
                name: p.name.clone(),
            },
        }
    }
}

/// Result of one dialog step, turned into a reply by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Saved(Command),
    AskName,
    AskContent,
    /// the offered name belongs to a directive; still waiting for a name
    ReservedName(String),
    Cancelled,
    NothingToCancel,
}

/// Builds the command to store; `arity` always comes from the normalized template.
pub fn compose_command(pack: String, name: String, content: Content, creator: &str) -> Command {
    let (kind, template, arity) = match content {
        Content::Text(text) => {
            let normalized = verbs::normalize(&text);
            (CommandKind::Text, normalized.template, normalized.arity)
        }
        Content::Sticker(token) => (CommandKind::Sticker, token, 0),
    };

    Command {
        pack,
        name,
        arity,
        kind,
        template,
        creator: creator.to_string(),
        updated_at: Utc::now(),
    }
}

pub struct DialogService {
    store: Arc<dyn CommandStore>,
    config: Arc<BotConfig>,
}

impl DialogService {
    pub fn new(store: Arc<dyn CommandStore>, config: Arc<BotConfig>) -> Self {
        Self { store, config }
    }

    pub async fn state(&self, chat_id: i64, user_id: i64) -> Result<DialogState, StoreError> {
        let pending = self.store.find_pending_definition(chat_id, user_id).await?;
        Ok(DialogState::of(pending.as_ref()))
    }

    /// Handles a define directive; `definition` is the text after the directive name.
    ///
    /// Replaces any dialog the user already had open in this chat.
    pub async fn start(
        &self,
        message: &InboundMessage,
        definition: &str,
    ) -> Result<DialogOutcome, StoreError> {
        let reference = reference::parse(definition, self.config.trigger);

        if !reference.has_name() || self.config.is_reserved(&reference.name) {
            // `default.` is a written pack too, kept apart from no pack at all
            let pending = if reference.explicit_pack {
                PendingDefinition::new(
                    message.chat_id,
                    message.user_id,
                    reference.pack.clone(),
                    String::new(),
                )
            } else {
                PendingDefinition::unresolved(message.chat_id, message.user_id)
            };
            self.store.save_pending_definition(&pending).await?;
            tracing::debug!(
                chat_id = message.chat_id,
                user_id = message.user_id,
                "Definition started, waiting for a name"
            );
            return Ok(self.missing_name(&reference));
        }

        let pack = resolve_pack(self.store.as_ref(), &reference, message.chat_id).await?;

        if reference.rest.is_empty() {
            let pending =
                PendingDefinition::new(message.chat_id, message.user_id, pack, reference.name);
            self.store.save_pending_definition(&pending).await?;
            tracing::debug!(
                chat_id = message.chat_id,
                user_id = message.user_id,
                pack = %pending.pack,
                name = %pending.name,
                "Definition started, waiting for content"
            );
            return Ok(DialogOutcome::AskContent);
        }

        let command = self
            .commit(message, pack, reference.name, Content::Text(reference.rest))
            .await?;
        Ok(DialogOutcome::Saved(command))
    }

    /// Offers a non-command message to the user's open dialog.
    ///
    /// Returns `None` when no dialog is open, leaving the message unhandled.
    pub async fn advance(
        &self,
        message: &InboundMessage,
    ) -> Result<Option<DialogOutcome>, StoreError> {
        let Some(mut pending) = self
            .store
            .find_pending_definition(message.chat_id, message.user_id)
            .await?
        else {
            return Ok(None);
        };

        let outcome = if pending.name.is_empty() {
            self.supply_name(message, &mut pending).await?
        } else {
            self.supply_content(message, &mut pending).await?
        };
        Ok(Some(outcome))
    }

    /// Abandons the user's open dialog, if any.
    pub async fn cancel(&self, message: &InboundMessage) -> Result<DialogOutcome, StoreError> {
        let pending = self
            .store
            .find_pending_definition(message.chat_id, message.user_id)
            .await?;
        if pending.is_none() {
            return Ok(DialogOutcome::NothingToCancel);
        }

        self.store
            .remove_pending_definition(message.chat_id, message.user_id)
            .await?;
        tracing::debug!(
            chat_id = message.chat_id,
            user_id = message.user_id,
            "Definition cancelled"
        );
        Ok(DialogOutcome::Cancelled)
    }

    async fn supply_name(
        &self,
        message: &InboundMessage,
        pending: &mut PendingDefinition,
    ) -> Result<DialogOutcome, StoreError> {
        // a sticker cannot be a name
        let reference = match message.content() {
            Some(Content::Text(text)) => reference::parse(&text, self.config.trigger),
            _ => Reference::default(),
        };

        if !reference.has_name() || self.config.is_reserved(&reference.name) {
            pending.touch();
            self.store.save_pending_definition(pending).await?;
            return Ok(self.missing_name(&reference));
        }

        // a pack given with the directive wins over the one in this message
        if !pending.pack_resolved {
            pending.pack = resolve_pack(self.store.as_ref(), &reference, message.chat_id).await?;
            pending.pack_resolved = true;
        }

        if !reference.rest.is_empty() {
            let command = self
                .commit(
                    message,
                    pending.pack.clone(),
                    reference.name,
                    Content::Text(reference.rest),
                )
                .await?;
            return Ok(DialogOutcome::Saved(command));
        }

        pending.name = reference.name;
        pending.awaiting_content = true;
        pending.touch();
        self.store.save_pending_definition(pending).await?;
        Ok(DialogOutcome::AskContent)
    }

    async fn supply_content(
        &self,
        message: &InboundMessage,
        pending: &mut PendingDefinition,
    ) -> Result<DialogOutcome, StoreError> {
        // taken verbatim, never parsed as pack.name
        let Some(content) = message.content() else {
            pending.touch();
            self.store.save_pending_definition(pending).await?;
            return Ok(DialogOutcome::AskContent);
        };

        let command = self
            .commit(message, pending.pack.clone(), pending.name.clone(), content)
            .await?;
        Ok(DialogOutcome::Saved(command))
    }

    /// Stores the command, then closes the dialog.
    ///
    /// A failed upsert leaves the pending row as it was so the next message retries.
    /// If only the removal fails, the command stays stored and the dialog stays open;
    /// the next content message then replaces the command under the same key.
    async fn commit(
        &self,
        message: &InboundMessage,
        pack: String,
        name: String,
        content: Content,
    ) -> Result<Command, StoreError> {
        let command = compose_command(pack, name, content, &message.user_display);
        self.store.upsert(&command).await?;
        self.store
            .remove_pending_definition(message.chat_id, message.user_id)
            .await?;

        tracing::info!(
            chat_id = message.chat_id,
            creator = %command.creator,
            command = %command.full_name(),
            arity = command.arity,
            kind = %command.kind,
            "Saved command"
        );
        Ok(command)
    }

    fn missing_name(&self, reference: &Reference) -> DialogOutcome {
        if reference.has_name() {
            DialogOutcome::ReservedName(reference.name.clone())
        } else {
            DialogOutcome::AskName
        }
    }
}

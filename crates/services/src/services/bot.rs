//! Routing of inbound chat messages to the dialog and the resolver.

use std::sync::Arc;

use thiserror::Error;

use super::{
    chat::{InboundMessage, OutboundReply},
    config::{BotConfig, Directive},
    dialog::{DialogOutcome, DialogService},
    reference::{self, Reference},
    replies,
    resolver::{CommandResolver, Rendered, ResolveError},
    store::{CommandStore, StoreError},
};

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct BotService {
    config: Arc<BotConfig>,
    dialog: DialogService,
    resolver: CommandResolver,
}

impl BotService {
    pub fn new(store: Arc<dyn CommandStore>, config: BotConfig) -> Self {
        let config = Arc::new(config);
        Self {
            dialog: DialogService::new(store.clone(), config.clone()),
            resolver: CommandResolver::new(store),
            config,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn dialog(&self) -> &DialogService {
        &self.dialog
    }

    /// Handles one message, returning the reply to send, if any.
    ///
    /// An error means a store call failed; nothing should be sent and the
    /// conversation state is whatever the store last accepted.
    pub async fn handle(
        &self,
        message: &InboundMessage,
    ) -> Result<Option<OutboundReply>, BotError> {
        if !message.is_command(self.config.trigger) {
            let outcome = self.dialog.advance(message).await?;
            return Ok(outcome.map(|outcome| dialog_reply(message, outcome)));
        }

        let reference = reference::parse(&message.text, self.config.trigger);
        if !reference.has_name() {
            tracing::debug!(text = %message.text, "Unsupported message text");
            return Ok(None);
        }

        // directives are only recognized without a pack
        let directive = if reference.explicit_pack {
            None
        } else {
            self.config.directive(&reference.name)
        };

        let reply = match directive {
            Some(Directive::Define) => {
                let outcome = self.dialog.start(message, &reference.rest).await?;
                Some(dialog_reply(message, outcome))
            }
            Some(Directive::Cancel) => {
                let outcome = self.dialog.cancel(message).await?;
                Some(dialog_reply(message, outcome))
            }
            Some(Directive::Info) => self.describe(message, &reference.rest).await?,
            None => self.invoke(message, &reference).await?,
        };

        tracing::debug!(
            chat_id = message.chat_id,
            user = %message.user_display,
            name = %reference.name,
            replied = reply.is_some(),
            "Handled command"
        );
        Ok(reply)
    }

    async fn invoke(
        &self,
        message: &InboundMessage,
        reference: &Reference,
    ) -> Result<Option<OutboundReply>, BotError> {
        let rendered = match self.resolver.resolve(reference, message.chat_id).await {
            Ok(rendered) => rendered,
            Err(err) => return self.unresolved(message, err),
        };

        // quote reply: answer under the message the invoker replied to
        let reply = match rendered {
            Rendered::Text(text) => OutboundReply::text(message.chat_id, text),
            Rendered::Sticker(token) => OutboundReply::sticker(message.chat_id, token),
        };
        Ok(Some(reply.replying_to(message.reply_to_message_id)))
    }

    async fn describe(
        &self,
        message: &InboundMessage,
        target: &str,
    ) -> Result<Option<OutboundReply>, BotError> {
        let reference = reference::parse(target, self.config.trigger);
        if !reference.has_name() {
            return Ok(Some(
                OutboundReply::text(message.chat_id, replies::MISSING_INFO_NAME)
                    .prompt(message.message_id),
            ));
        }

        match self.resolver.find(&reference, message.chat_id).await {
            Ok(command) => Ok(Some(
                OutboundReply::text(message.chat_id, replies::command_info(&command))
                    .markdown()
                    .replying_to(Some(message.message_id)),
            )),
            Err(err) => self.unresolved(message, err),
        }
    }

    fn unresolved(
        &self,
        message: &InboundMessage,
        err: ResolveError,
    ) -> Result<Option<OutboundReply>, BotError> {
        match err {
            ResolveError::NotFound { pack, name, arity } => {
                tracing::debug!(%pack, %name, arity, "Command not found");
                if !self.config.announce_unknown_commands {
                    return Ok(None);
                }
                let full_name = if pack.is_empty() {
                    name
                } else {
                    format!("{}.{}", pack, name)
                };
                let text = replies::unknown_command(&full_name, arity);
                Ok(Some(
                    OutboundReply::text(message.chat_id, text)
                        .replying_to(Some(message.message_id)),
                ))
            }
            ResolveError::Store(err) => Err(err.into()),
        }
    }
}

fn dialog_reply(message: &InboundMessage, outcome: DialogOutcome) -> OutboundReply {
    let chat_id = message.chat_id;
    match outcome {
        DialogOutcome::Saved(command) => {
            OutboundReply::text(chat_id, replies::saved_command(&command)).markdown()
        }
        DialogOutcome::AskName => {
            OutboundReply::text(chat_id, replies::MISSING_NAME).prompt(message.message_id)
        }
        DialogOutcome::AskContent => {
            OutboundReply::text(chat_id, replies::MISSING_CONTENT).prompt(message.message_id)
        }
        DialogOutcome::ReservedName(name) => {
            OutboundReply::text(chat_id, replies::reserved_name(&name)).prompt(message.message_id)
        }
        DialogOutcome::Cancelled => OutboundReply::text(chat_id, replies::CANCELLED),
        DialogOutcome::NothingToCancel => OutboundReply::text(chat_id, replies::NOTHING_TO_CANCEL),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::services::{
        chat::{ReplyBody, ReplyFormat},
        dialog::DialogState,
        store::test_support::{FlakyStore, sqlite_store},
    };

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: 9,
            user_id: 3,
            user_display: "@alice".to_string(),
            message_id: 100,
            text: text.to_string(),
            ..Default::default()
        }
    }

    async fn bot(config: BotConfig) -> BotService {
        BotService::new(Arc::new(sqlite_store().await), config)
    }

    fn text(reply: &OutboundReply) -> &str {
        match &reply.body {
            ReplyBody::Text(text) => text,
            ReplyBody::Sticker(_) => panic!("expected text reply"),
        }
    }

    #[tokio::test]
    async fn test_define_then_invoke() {
        let bot = bot(BotConfig::default()).await;

        let reply = bot.handle(&message("/neverforget hi Hello %s")).await.unwrap().unwrap();
        assert_eq!(text(&reply), "Saved command *default.hi* `(with 1 parameters)`");
        assert_eq!(reply.format, ReplyFormat::Markdown);

        let reply = bot.handle(&message("/hi Sam")).await.unwrap().unwrap();
        assert_eq!(text(&reply), "Hello Sam");
        assert_eq!(reply.format, ReplyFormat::Plain);
        assert_eq!(reply.reply_to, None);
    }

    #[tokio::test]
    async fn test_invocation_threads_under_quoted_message() {
        let bot = bot(BotConfig::default()).await;
        bot.handle(&message("/never4get hi Hello")).await.unwrap();

        let quoting = InboundMessage {
            reply_to_message_id: Some(55),
            ..message("/hi")
        };
        let reply = bot.handle(&quoting).await.unwrap().unwrap();
        assert_eq!(reply.reply_to, Some(55));
    }

    #[tokio::test]
    async fn test_prompts_force_reply_to_sender() {
        let bot = bot(BotConfig::default()).await;

        let reply = bot.handle(&message("/neverforget")).await.unwrap().unwrap();
        assert_eq!(text(&reply), replies::MISSING_NAME);
        assert_eq!(reply.reply_to, Some(100));
        assert!(reply.force_reply);

        let reply = bot.handle(&message("hi")).await.unwrap().unwrap();
        assert_eq!(text(&reply), replies::MISSING_CONTENT);
        assert!(reply.force_reply);

        let reply = bot.handle(&message("Hello")).await.unwrap().unwrap();
        assert_eq!(text(&reply), "Saved command *default.hi* `(with 0 parameters)`");
        assert_eq!(bot.dialog().state(9, 3).await.unwrap(), DialogState::Idle);
    }

    #[tokio::test]
    async fn test_plain_chatter_is_ignored() {
        let bot = bot(BotConfig::default()).await;
        assert_eq!(bot.handle(&message("just talking")).await.unwrap(), None);
        assert_eq!(bot.handle(&message("/")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_command_during_dialog_does_not_feed_it() {
        let bot = bot(BotConfig::default()).await;
        bot.handle(&message("/neverforget hi")).await.unwrap();

        assert_eq!(bot.handle(&message("/unknown")).await.unwrap(), None);
        assert_eq!(
            bot.dialog().state(9, 3).await.unwrap(),
            DialogState::WaitingContent { pack: String::new(), name: "hi".into() }
        );
    }

    #[tokio::test]
    async fn test_unknown_command_is_silent_by_default() {
        let bot = bot(BotConfig::default()).await;
        assert_eq!(bot.handle(&message("/nope a")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_command_can_be_announced() {
        let config = BotConfig {
            announce_unknown_commands: true,
            ..BotConfig::default()
        };
        let bot = bot(config).await;

        let reply = bot.handle(&message("/team.nope a, b")).await.unwrap().unwrap();
        assert_eq!(text(&reply), "I don't know team.nope with 2 parameters");
    }

    #[tokio::test]
    async fn test_info_directive() {
        let bot = bot(BotConfig::default()).await;
        bot.handle(&message("/neverforget team.greet Hi %s")).await.unwrap();

        let reply = bot.handle(&message("/i team.greet someone")).await.unwrap().unwrap();
        assert_eq!(reply.format, ReplyFormat::Markdown);
        assert!(text(&reply).starts_with("*team.greet* `(with 1 parameters)`\n_Hi %s_"));
        assert!(text(&reply).contains("*Last updated by* @alice *on*"));

        // wrong arity
        assert_eq!(bot.handle(&message("/i team.greet")).await.unwrap(), None);

        let reply = bot.handle(&message("/i")).await.unwrap().unwrap();
        assert_eq!(text(&reply), replies::MISSING_INFO_NAME);
    }

    #[tokio::test]
    async fn test_cancel_directive() {
        let bot = bot(BotConfig::default()).await;
        bot.handle(&message("/neverforget hi")).await.unwrap();

        let reply = bot.handle(&message("/nevermind")).await.unwrap().unwrap();
        assert_eq!(text(&reply), replies::CANCELLED);
        assert_eq!(bot.handle(&message("Hello")).await.unwrap(), None);

        let reply = bot.handle(&message("/nevermind")).await.unwrap().unwrap();
        assert_eq!(text(&reply), replies::NOTHING_TO_CANCEL);
    }

    #[tokio::test]
    async fn test_custom_trigger() {
        let config = BotConfig {
            trigger: '!',
            ..BotConfig::default()
        };
        let bot = bot(config).await;
        bot.handle(&message("!neverforget hi yo")).await.unwrap().unwrap();

        let reply = bot.handle(&message("!hi")).await.unwrap().unwrap();
        assert_eq!(text(&reply), "yo");
        assert_eq!(bot.handle(&message("/hi")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sticker_command() {
        let bot = bot(BotConfig::default()).await;
        bot.handle(&message("/neverforget cat")).await.unwrap();

        let sticker = InboundMessage {
            sticker: Some("CAACAgI".to_string()),
            ..message("")
        };
        bot.handle(&sticker).await.unwrap().unwrap();

        let reply = bot.handle(&message("/cat")).await.unwrap().unwrap();
        assert_eq!(reply.body, ReplyBody::Sticker("CAACAgI".to_string()));
    }

    #[tokio::test]
    async fn test_store_failure_yields_error_and_no_reply() {
        let flaky = FlakyStore::new().await;
        let fail_writes = flaky.fail_writes.clone();
        let bot = BotService::new(Arc::new(flaky), BotConfig::default());
        bot.handle(&message("/neverforget hi")).await.unwrap();

        fail_writes.store(true, Ordering::SeqCst);
        assert!(bot.handle(&message("Hello")).await.is_err());

        fail_writes.store(false, Ordering::SeqCst);
        let reply = bot.handle(&message("Hello")).await.unwrap().unwrap();
        assert_eq!(text(&reply), "Saved command *default.hi* `(with 0 parameters)`");
    }
}

use std::{sync::Arc, time::Duration};

use services::services::{bot::BotService, chat::InboundMessage};
use tracing::Instrument;

use crate::telegram::{TelegramClient, Update};

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-polls Telegram forever, handling each message on its own task.
pub async fn run(
    telegram: Arc<TelegramClient>,
    bot: Arc<BotService>,
    bot_username: String,
    poll_timeout: Duration,
) {
    let mut offset = 0;
    tracing::info!(username = %bot_username, "Polling for updates");

    loop {
        let updates = match telegram.get_updates(offset, poll_timeout).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch updates, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            if let Some(message) = inbound(update, bot.config().trigger, &bot_username) {
                dispatch(telegram.clone(), bot.clone(), message);
            }
        }
    }
}

fn inbound(update: Update, trigger: char, bot_username: &str) -> Option<InboundMessage> {
    update.message?.into_inbound(trigger, bot_username)
}

fn dispatch(telegram: Arc<TelegramClient>, bot: Arc<BotService>, message: InboundMessage) {
    let span = tracing::info_span!(
        "message",
        chat_id = message.chat_id,
        user_id = message.user_id,
        message_id = message.message_id
    );

    tokio::spawn(
        async move {
            // failed handling sends nothing; the stored state is left for the next message
            let reply = match bot.handle(&message).await {
                Ok(Some(reply)) => reply,
                Ok(None) => return,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to handle message");
                    return;
                }
            };

            if let Err(e) = telegram.deliver(&reply).await {
                tracing::warn!(error = %e, "Failed to deliver reply");
            }
        }
        .instrument(span),
    );
}

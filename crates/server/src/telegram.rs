//! Minimal Telegram Bot API client over long polling.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use services::services::chat::{InboundMessage, OutboundReply, ReplyBody, ReplyFormat};
use thiserror::Error;
use utils::text::truncate_chars;

const API_BASE: &str = "https://api.telegram.org";
/// sendMessage rejects texts with more characters
const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("API response had no result")]
    NoResult,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sticker: Option<Sticker>,
    #[serde(default)]
    pub reply_to_message: Option<Box<Message>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// `@username` when set, else the full name.
    pub fn display(&self) -> String {
        match &self.username {
            Some(username) => format!("@{}", username),
            None => match &self.last_name {
                Some(last) => format!("{} {}", self.first_name, last),
                None => self.first_name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sticker {
    pub file_id: String,
}

impl Message {
    /// Converts to the transport-neutral shape; `None` for messages without a human sender.
    pub fn into_inbound(self, trigger: char, bot_username: &str) -> Option<InboundMessage> {
        let from = self.from.filter(|user| !user.is_bot)?;
        let text = self
            .text
            .map(|text| strip_mention(&text, trigger, bot_username))
            .unwrap_or_default();

        Some(InboundMessage {
            chat_id: self.chat.id,
            user_id: from.id,
            user_display: from.display(),
            message_id: self.message_id,
            text,
            sticker: self.sticker.map(|s| s.file_id),
            reply_to_message_id: self.reply_to_message.map(|m| m.message_id),
        })
    }
}

/// Drops the `@botname` suffix Telegram adds to commands in groups, when it names us.
pub fn strip_mention(text: &str, trigger: char, bot_username: &str) -> String {
    if !text.starts_with(trigger) || bot_username.is_empty() {
        return text.to_string();
    }

    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    let (head, tail) = text.split_at(end);
    match head.rsplit_once('@') {
        Some((command, mention)) if mention.eq_ignore_ascii_case(bot_username) => {
            format!("{}{}", command, tail)
        }
        _ => text.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct ReplyParameters {
    message_id: i64,
    allow_sending_without_reply: bool,
}

#[derive(Debug, Serialize)]
struct ForceReply {
    force_reply: bool,
    selective: bool,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_parameters: Option<ReplyParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ForceReply>,
}

#[derive(Debug, Serialize)]
struct SendSticker<'a> {
    chat_id: i64,
    sticker: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_parameters: Option<ReplyParameters>,
}

fn send_message<'a>(reply: &OutboundReply, text: &'a str) -> SendMessage<'a> {
    SendMessage {
        chat_id: reply.chat_id,
        text: truncate_chars(text, MAX_MESSAGE_LEN),
        parse_mode: match reply.format {
            ReplyFormat::Markdown => Some("Markdown"),
            ReplyFormat::Plain => None,
        },
        reply_parameters: reply_parameters(reply),
        reply_markup: reply.force_reply.then_some(ForceReply {
            force_reply: true,
            selective: true,
        }),
    }
}

fn reply_parameters(reply: &OutboundReply) -> Option<ReplyParameters> {
    reply.reply_to.map(|message_id| ReplyParameters {
        message_id,
        allow_sending_without_reply: true,
    })
}

pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    /// `poll_timeout` is the getUpdates long polling timeout; the HTTP timeout adds slack.
    pub fn new(token: &str, poll_timeout: Duration) -> Result<Self, TelegramError> {
        Self::with_base_url(API_BASE, token, poll_timeout)
    }

    pub fn with_base_url(
        base: &str,
        token: &str,
        poll_timeout: Duration,
    ) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", base.trim_end_matches('/'), token),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // the url carries the token, keep it out of errors
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await
            .map_err(|e| TelegramError::Http(e.without_url()))?;

        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::Http(e.without_url()))?;

        if !body.ok {
            return Err(TelegramError::Api {
                status: body.error_code.unwrap_or(status.as_u16()),
                message: body
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            });
        }
        body.result.ok_or(TelegramError::NoResult)
    }

    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &request).await
    }

    /// Sends a reply produced by the bot.
    pub async fn deliver(&self, reply: &OutboundReply) -> Result<(), TelegramError> {
        match &reply.body {
            ReplyBody::Text(text) => {
                let request = send_message(reply, text);
                self.call::<_, serde_json::Value>("sendMessage", &request).await?;
            }
            ReplyBody::Sticker(token) => {
                let request = SendSticker {
                    chat_id: reply.chat_id,
                    sticker: token,
                    reply_parameters: reply_parameters(reply),
                };
                self.call::<_, serde_json::Value>("sendSticker", &request).await?;
            }
        }
        Ok(())
    }
}

//! Transport-neutral inbound and outbound message shapes.

/// A message received from the chat transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub user_id: i64,
    /// `@username` when the user has one, else their display name
    pub user_display: String,
    pub message_id: i64,
    pub text: String,
    /// sticker token, when the message is a sticker
    pub sticker: Option<String>,
    /// the message this one replies to
    pub reply_to_message_id: Option<i64>,
}

impl InboundMessage {
    pub fn is_command(&self, trigger: char) -> bool {
        self.text.starts_with(trigger)
    }

    /// What the message carries as command content, if anything.
    pub fn content(&self) -> Option<Content> {
        if let Some(sticker) = &self.sticker {
            return Some(Content::Sticker(sticker.clone()));
        }
        if self.text.trim().is_empty() {
            None
        } else {
            Some(Content::Text(self.text.clone()))
        }
    }
}

/// Content supplied for a command being defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Sticker(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    Text(String),
    Sticker(String),
}

/// Rendering hint for text replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplyFormat {
    #[default]
    Plain,
    Markdown,
}

/// A reply for the transport to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub chat_id: i64,
    pub body: ReplyBody,
    pub format: ReplyFormat,
    /// message to thread the reply under
    pub reply_to: Option<i64>,
    /// ask the client to open a reply box aimed at the sender
    pub force_reply: bool,
}

impl OutboundReply {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            body: ReplyBody::Text(text.into()),
            format: ReplyFormat::Plain,
            reply_to: None,
            force_reply: false,
        }
    }

    pub fn sticker(chat_id: i64, token: impl Into<String>) -> Self {
        Self {
            body: ReplyBody::Sticker(token.into()),
            ..Self::text(chat_id, String::new())
        }
    }

    pub fn markdown(mut self) -> Self {
        self.format = ReplyFormat::Markdown;
        self
    }

    pub fn replying_to(mut self, message_id: Option<i64>) -> Self {
        self.reply_to = message_id;
        self
    }

    /// Prompt form: threaded under `message_id` with a selective force-reply.
    pub fn prompt(mut self, message_id: i64) -> Self {
        self.reply_to = Some(message_id);
        self.force_reply = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: 1,
            user_id: 2,
            user_display: "@alice".to_string(),
            message_id: 3,
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_command() {
        assert!(message("/hi").is_command('/'));
        assert!(!message("hi").is_command('/'));
        assert!(!message(" /hi").is_command('/'));
        assert!(message("!hi").is_command('!'));
    }

    #[test]
    fn test_content_prefers_sticker() {
        let mut m = message("");
        assert_eq!(m.content(), None);

        m.sticker = Some("CAACAgI".to_string());
        assert_eq!(m.content(), Some(Content::Sticker("CAACAgI".to_string())));

        assert_eq!(message(" hello ").content(), Some(Content::Text(" hello ".to_string())));
        assert_eq!(message("  \n").content(), None);
    }

    #[test]
    fn test_reply_builders() {
        let reply = OutboundReply::text(1, "hi").markdown().prompt(9);
        assert_eq!(reply.format, ReplyFormat::Markdown);
        assert_eq!(reply.reply_to, Some(9));
        assert!(reply.force_reply);

        let sticker = OutboundReply::sticker(1, "tok").replying_to(Some(4));
        assert_eq!(sticker.body, ReplyBody::Sticker("tok".to_string()));
        assert_eq!(sticker.reply_to, Some(4));
        assert!(!sticker.force_reply);
        assert_eq!(sticker.format, ReplyFormat::Plain);
    }
}

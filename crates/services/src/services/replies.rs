//! User-facing reply texts.

use chrono::Datelike;
use db::models::command::{Command, CommandKind};
use utils::text::{escape_markdown, truncate_chars};

pub const MISSING_NAME: &str = "Please, send me a name for the command";
pub const MISSING_CONTENT: &str = "Please, send me the content for the command";
pub const MISSING_INFO_NAME: &str = "Please, tell me which command you want to know about";
pub const CANCELLED: &str = "Okay, I forgot about that command";
pub const NOTHING_TO_CANCEL: &str = "There is no command waiting for content";

/// escaping can double a template, this keeps the info reply under the message limit
const INFO_TEMPLATE_MAX_CHARS: usize = 1800;

/// Markdown confirmation after a command was stored.
pub fn saved_command(command: &Command) -> String {
    format!(
        "Saved command *{}* `(with {} parameters)`",
        escape_markdown(&command.full_name()),
        command.arity
    )
}

/// Markdown description of a stored command.
pub fn command_info(command: &Command) -> String {
    let creator = escape_markdown(&command.creator);
    let creator = if command.creator.starts_with('@') {
        creator
    } else {
        format!("`{}`", creator)
    };

    let content = match command.kind {
        CommandKind::Text => {
            escape_markdown(truncate_chars(&command.template, INFO_TEMPLATE_MAX_CHARS))
        }
        CommandKind::Sticker => "sticker".to_string(),
    };

    let date = command.updated_at.date_naive();
    format!(
        "*{}* `(with {} parameters)`\n_{}_\n\n*Last updated by* {} *on* `{}/{}/{}`",
        escape_markdown(&command.full_name()),
        command.arity,
        content,
        creator,
        date.year(),
        date.month(),
        date.day()
    )
}

pub fn reserved_name(name: &str) -> String {
    format!("\"{}\" is reserved, please send me another name for the command", name)
}

pub fn unknown_command(full_name: &str, arity: u32) -> String {
    format!("I don't know {} with {} parameters", full_name, arity)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn command(creator: &str) -> Command {
        Command {
            pack: "team".to_string(),
            name: "greet_all".to_string(),
            arity: 1,
            kind: CommandKind::Text,
            template: "Hi *%s*".to_string(),
            creator: creator.to_string(),
            updated_at: Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_saved_command_escapes_name() {
        assert_eq!(
            saved_command(&command("@alice")),
            "Saved command *team.greet\\_all* `(with 1 parameters)`"
        );
    }

    #[test]
    fn test_command_info_with_username() {
        assert_eq!(
            command_info(&command("@al_ice")),
            "*team.greet\\_all* `(with 1 parameters)`\n_Hi \\*%s\\*_\n\n*Last updated by* @al\\_ice *on* `2026/3/7`"
        );
    }

    #[test]
    fn test_command_info_with_plain_name_uses_code() {
        let info = command_info(&command("Alice Smith"));
        assert!(info.contains("*Last updated by* `Alice Smith` *on*"));
    }

    #[test]
    fn test_command_info_for_sticker() {
        let mut sticker = command("@alice");
        sticker.kind = CommandKind::Sticker;
        sticker.arity = 0;
        assert!(command_info(&sticker).contains("\n_sticker_\n"));
    }

    #[test]
    fn test_command_info_cuts_long_template_before_escaping() {
        let mut long = command("@alice");
        long.template = "_".repeat(5000);
        let info = command_info(&long);

        // every kept underscore stays escaped
        assert!(info.contains(&format!("\n_{}_\n", "\\_".repeat(INFO_TEMPLATE_MAX_CHARS))));
        assert!(info.chars().count() < 4096);
    }
}

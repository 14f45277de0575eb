use once_cell::sync::Lazy;
use regex::Regex;

// characters with meaning in Telegram's legacy Markdown mode
static MARKDOWN_SPECIALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_`\[]").unwrap());

/// Escapes user supplied text so it renders literally inside a Markdown reply.
pub fn escape_markdown(input: &str) -> String {
    MARKDOWN_SPECIALS
        .replace_all(input, |caps: &regex::Captures| format!("\\{}", &caps[0]))
        .into_owned()
}

/// Cuts `content` to at most `max_chars` characters.
pub fn truncate_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((cutoff, _)) => &content[..cutoff],
        None => content,
    }
}

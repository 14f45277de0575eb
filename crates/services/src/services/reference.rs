//! Splitting chat text into a `pack.name` reference and its arguments.

/// Literal separator between invocation arguments.
///
/// Arguments that themselves contain `", "` are split apart; there is no quoting.
pub const ARGUMENT_DELIMITER: &str = ", ";

/// Pack token that always means the default (empty) pack.
pub const DEFAULT_PACK_TOKEN: &str = "default";

/// The parsed form of `[trigger][pack.]name [arg, arg, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reference {
    /// empty for the default pack, or when no pack was written
    pub pack: String,
    /// empty when no name was given
    pub name: String,
    /// whether `pack` was written out; if not, the chat's default pack applies
    pub explicit_pack: bool,
    pub arguments: Vec<String>,
    /// everything after the first token, trimmed
    pub rest: String,
}

impl Reference {
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn arity(&self) -> u32 {
        u32::try_from(self.arguments.len()).unwrap_or(u32::MAX)
    }
}

/// Parses `text`, stripping one leading `trigger` character if present.
pub fn parse(text: &str, trigger: char) -> Reference {
    let text = text.strip_prefix(trigger).unwrap_or(text).trim_start();

    let (head, rest) = match text.find(char::is_whitespace) {
        Some(space) => (&text[..space], text[space..].trim()),
        None => (text, ""),
    };

    let (pack, name, explicit_pack) = split_full_name(head);

    let arguments = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(ARGUMENT_DELIMITER).map(str::to_string).collect()
    };

    Reference {
        pack,
        name,
        explicit_pack,
        arguments,
        rest: rest.to_string(),
    }
}

/// Splits `<pack>.<name>` on the first dot; `<name>` alone leaves the pack implicit.
fn split_full_name(head: &str) -> (String, String, bool) {
    match head.split_once('.') {
        Some((pack, name)) => {
            let pack = pack.trim();
            let pack = if pack == DEFAULT_PACK_TOKEN { "" } else { pack };
            (pack.to_string(), name.trim().to_string(), true)
        }
        None => (String::new(), head.trim().to_string(), false),
    }
}

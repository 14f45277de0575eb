//! Placeholder normalization for command templates.
//!
//! User content may contain any `%` sequence. Before a template is stored every
//! verb is coerced into one of the two supported string placeholders:
//!
//! - `%s` takes the next argument in order
//! - `%[k]s` takes argument `k` (1-based)
//!
//! `%%` stays a literal percent sign. A `%` that cannot start a verb (end of text,
//! whitespace after it, an unclosed `[`) is kept as plain text.

/// Flags accepted, and dropped, between `%` and the verb.
const FLAGS: [char; 4] = ['#', '+', '-', '0'];

/// A template after normalization, with the number of arguments it takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub template: String,
    pub arity: u32,
}

/// Rewrites every verb in `raw` to a string placeholder and counts its slots.
///
/// Normalizing an already normalized template returns it unchanged.
pub fn normalize(raw: &str) -> Normalized {
    let template = coerce_verbs(raw);
    let arity = count_verbs(&template);
    Normalized { template, arity }
}

/// Number of arguments `template` needs: the larger of the highest `%[k]s`
/// index and the number of plain `%s` placeholders.
pub fn count_verbs(template: &str) -> u32 {
    let mut num_not_indexed: u32 = 0;
    let mut max_index: u32 = 0;

    for segment in segments(template) {
        match segment {
            Segment::Next => num_not_indexed = num_not_indexed.saturating_add(1),
            Segment::Indexed(index) => max_index = max_index.max(index),
            Segment::Literal(_) | Segment::Percent => {}
        }
    }

    max_index.max(num_not_indexed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Percent,
    Next,
    Indexed(u32),
}

impl Verb {
    fn write_to(self, out: &mut String) {
        match self {
            Verb::Percent => out.push_str("%%"),
            Verb::Next => out.push_str("%s"),
            Verb::Indexed(index) => {
                out.push_str("%[");
                out.push_str(&index.to_string());
                out.push_str("]s");
            }
        }
    }
}

fn coerce_verbs(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match scan_verb(rest) {
            Some((verb, len)) => {
                verb.write_to(&mut out);
                rest = &rest[len..];
            }
            None => {
                out.push('%');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Reads `%[flag][[index]]verb` at the start of `s`, returning the verb and its byte length.
fn scan_verb(s: &str) -> Option<(Verb, usize)> {
    debug_assert!(s.starts_with('%'));
    if s[1..].starts_with('%') {
        return Some((Verb::Percent, 2));
    }

    let mut at = 1;
    if let Some(flag) = s[at..].chars().next()
        && FLAGS.contains(&flag)
    {
        at += flag.len_utf8();
    }

    let mut index = None;
    if s[at..].starts_with('[') {
        let close = at + s[at..].find(']')?;
        let inner = &s[at + 1..close];
        if inner.chars().any(char::is_whitespace) {
            return None;
        }
        index = Some(parse_index(inner));
        at = close + 1;
    }

    let verb = s[at..].chars().next()?;
    if verb.is_whitespace() || verb == '%' || verb == '[' {
        return None;
    }
    at += verb.len_utf8();

    let verb = match index {
        Some(Some(index)) => Verb::Indexed(index),
        // a malformed index degrades to the plain placeholder
        Some(None) | None => Verb::Next,
    };
    Some((verb, at))
}

/// A positive decimal index, or `None` when the text is not one.
fn parse_index(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<u32>().ok().filter(|index| *index > 0)
}

/// A piece of a normalized template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Literal(&'a str),
    /// `%%`
    Percent,
    /// `%s`
    Next,
    /// `%[k]s`
    Indexed(u32),
}

/// Splits a template into literal text and the exact placeholder forms
/// `%%`, `%s` and `%[k]s`. Any other `%` is literal text.
pub(crate) fn segments(template: &str) -> Vec<Segment<'_>> {
    let bytes = template.as_bytes();
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        match placeholder_at(&template[i..]) {
            Some((segment, len)) => {
                if literal_start < i {
                    out.push(Segment::Literal(&template[literal_start..i]));
                }
                out.push(segment);
                i += len;
                literal_start = i;
            }
            None => i += 1,
        }
    }

    if literal_start < template.len() {
        out.push(Segment::Literal(&template[literal_start..]));
    }
    out
}

fn placeholder_at(s: &str) -> Option<(Segment<'_>, usize)> {
    let bytes = s.as_bytes();
    match bytes.get(1)? {
        b'%' => Some((Segment::Percent, 2)),
        b's' => Some((Segment::Next, 2)),
        b'[' => {
            let close = s.find(']')?;
            let digits = &s[2..close];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            if bytes.get(close + 1) != Some(&b's') {
                return None;
            }
            // an index that does not fit counts as a plain placeholder
            let segment = match parse_index(digits) {
                Some(index) => Segment::Indexed(index),
                None => Segment::Next,
            };
            Some((segment, close + 2))
        }
        _ => None,
    }
}

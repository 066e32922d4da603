//! Quoting, escaping and delimited-token parsing shared by the codecs.

use std::borrow::Cow;

/// A token read by [`parse_delimited`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: Cow<'a, str>,
    /// Whether the token was double-quoted on the wire. A quoted `"NULL"`
    /// is a string, a bare `NULL` is not.
    pub quoted: bool,
}

/// Wrap `text` in single quotes, doubling embedded single quotes.
///
/// Never emits backslash escapes, so the result means the same thing
/// whatever `standard_conforming_strings` is set to.
pub fn quote_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Wrap an identifier in double quotes, doubling embedded double quotes.
pub fn quote_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Whether `text` must be double-quoted to survive as a delimited token.
pub fn needs_quotes(unsafe_chars: &str, text: &str) -> bool {
    text.is_empty()
        || text.eq_ignore_ascii_case("null")
        || text
            .chars()
            .any(|c| c == '"' || c == '\\' || c.is_whitespace() || unsafe_chars.contains(c))
}

/// Emit `text` bare when that is unambiguous, otherwise double-quoted with
/// `"` and `\` backslash-escaped.
pub fn quote_delimited<'a>(unsafe_chars: &str, text: &'a str) -> Cow<'a, str> {
    if !needs_quotes(unsafe_chars, text) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    Cow::Owned(out)
}

/// Read one token from the front of `input`.
///
/// A token is either a double-quoted string (backslash escapes and doubled
/// quotes are un-escaped) or a maximal run of characters outside
/// `unsafe_chars`, in which a backslash still escapes the next character.
/// Returns the token and the unconsumed rest of the input.
pub fn parse_delimited<'a>(
    unsafe_chars: &str,
    input: &'a str,
) -> Result<(Token<'a>, &'a str), String> {
    if let Some(body) = input.strip_prefix('"') {
        let mut out = String::new();
        let mut chars = body.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => return Err("unterminated escape in quoted token".to_string()),
                },
                '"' => {
                    if let Some(&(_, '"')) = chars.peek() {
                        chars.next();
                        out.push('"');
                        continue;
                    }
                    let token = Token {
                        text: Cow::Owned(out),
                        quoted: true,
                    };
                    return Ok((token, &body[i + 1..]));
                }
                _ => out.push(c),
            }
        }
        return Err("unterminated quoted token".to_string());
    }

    let mut end = input.len();
    let mut escaped = false;
    let mut has_escape = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            has_escape = true;
            continue;
        }
        if c == '"' || unsafe_chars.contains(c) {
            end = i;
            break;
        }
    }
    if escaped {
        return Err("unterminated escape in bare token".to_string());
    }

    let raw = &input[..end];
    let text = if has_escape {
        Cow::Owned(unescape_bare(raw))
    } else {
        Cow::Borrowed(raw)
    };
    Ok((
        Token {
            text,
            quoted: false,
        },
        &input[end..],
    ))
}

fn unescape_bare(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

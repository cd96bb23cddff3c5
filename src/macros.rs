//! Textual macros applied to query text before parsing.
//!
//! A macro replaces a whole identifier token: with `http` defined,
//! `http and x` expands but `http.request` and `"http"` do not. Expansion is
//! a single pass, so expansion text is never expanded again.

use std::{borrow::Cow, collections::HashMap};

/// Errors raised when defining a macro.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacroError {
    #[error("Name error: invalid macro name \"{0}\"")]
    InvalidName(String),

    #[error("Malformed macro definition \"{0}\", expected name~expansion")]
    MalformedDefinition(String),
}

/// Mapping of macro name to expansion text.
///
/// ```
/// use capql::Macros;
///
/// let mut macros = Macros::new();
/// macros.define("http", r#"proto.name == "http""#).unwrap();
/// assert_eq!(
///     macros.expand("http and request.path == \"/\""),
///     r#"proto.name == "http" and request.path == "/""#,
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Macros {
    table: HashMap<String, String>,
}

impl Macros {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or overwrites a macro.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        expansion: impl Into<String>,
    ) -> Result<(), MacroError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(MacroError::InvalidName(name));
        }
        let expansion = expansion.into();
        log::debug!("macro {} defined as {}", name, expansion);
        self.table.insert(name, expansion);
        Ok(())
    }

    /// Defines a macro from a `name~expansion` payload.
    pub fn define_from(&mut self, definition: &str) -> Result<(), MacroError> {
        let (name, expansion) = parse_definition(definition)?;
        self.define(name, expansion)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.table.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Substitutes every defined macro name appearing as a whole token.
    ///
    /// String and regex literals are copied untouched.
    pub fn expand<'q>(&self, query: &'q str) -> Cow<'q, str> {
        if self.table.is_empty() {
            return Cow::Borrowed(query);
        }

        let mut out = String::with_capacity(query.len());
        let mut replaced = false;
        let mut rest = query;

        while let Some(ch) = rest.chars().next() {
            if ch == '"' {
                let end = literal_end(rest);
                out.push_str(&rest[..end]);
                rest = &rest[end..];
            } else if is_token_char(ch) {
                let end = rest
                    .find(|c: char| !is_token_char(c) && c != '.')
                    .unwrap_or(rest.len());
                let token = &rest[..end];
                rest = &rest[end..];

                // `r"..."` is a regex literal, not a token named `r`.
                let is_regex_prefix = token == "r" && rest.starts_with('"');

                match self.table.get(token) {
                    Some(expansion) if !is_regex_prefix => {
                        out.push_str(expansion);
                        replaced = true;
                    }
                    _ => out.push_str(token),
                }
            } else {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }

        if replaced {
            log::debug!("expanded query {:?} to {:?}", query, out);
            Cow::Owned(out)
        } else {
            Cow::Borrowed(query)
        }
    }
}

impl FromIterator<(String, String)> for Macros {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Macros {
            table: iter.into_iter().collect(),
        }
    }
}

/// Splits a `name~expansion` payload at the first `~`.
pub fn parse_definition(definition: &str) -> Result<(&str, &str), MacroError> {
    definition
        .split_once('~')
        .map(|(name, expansion)| (name.trim(), expansion.trim()))
        .ok_or_else(|| MacroError::MalformedDefinition(definition.to_string()))
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Names look like field paths: `http`, `tcp_only`, `req.ua`.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            segment
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && segment.chars().all(is_token_char)
        })
}

/// Byte length of the quoted literal at the start of `text`, closing quote
/// included. Unterminated literals run to the end.
fn literal_end(text: &str) -> usize {
    let mut escaped = false;
    for (i, ch) in text.char_indices().skip(1) {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return i + 1,
            _ => {}
        }
    }
    text.len()
}

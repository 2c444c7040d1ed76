//! Pattern extraction from fetched page text.

use regex::Regex;

use crate::error::{ResolveError, Result};
use crate::profile::FieldPattern;

/// A compiled [`FieldPattern`].
#[derive(Debug, Clone)]
pub struct Extractor {
    regex: Regex,
    label: String,
}

/// One listing match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub label: Option<String>,
}

impl Extractor {
    /// Compile a field pattern.
    pub fn compile(pattern: &FieldPattern) -> Result<Self> {
        match pattern {
            FieldPattern::Assignment(name) => Self::assignment(name),
            FieldPattern::Regex(source) => Self::regex(source),
        }
    }

    /// Match `name = "v"`, `name: 'v'`, `"name":"v"` and backtick strings.
    ///
    /// The name must not be the tail of a longer identifier.
    pub fn assignment(name: &str) -> Result<Self> {
        let source = format!(
            r#"(?:^|[^\w$])["']?{}["']?\s*[:=]\s*["'`]([^"'`]*)["'`]"#,
            regex::escape(name)
        );
        Ok(Self {
            regex: compile(&source)?,
            label: name.to_string(),
        })
    }

    /// Wrap a raw regular expression. Group `url`, else group 1, is the value.
    ///
    /// A pattern with no capture group can never yield a value and is
    /// rejected as an invalid profile.
    pub fn regex(source: &str) -> Result<Self> {
        let regex = compile(source)?;
        if regex.captures_len() < 2 {
            return Err(ResolveError::InvalidProfile(format!(
                "pattern `{}` has no capture group",
                source
            )));
        }
        Ok(Self {
            regex,
            label: source.to_string(),
        })
    }

    /// What this extractor looks for, for error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// First non-empty value in `text`.
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.name("url").or_else(|| caps.get(1)))
            .map(|m| m.as_str())
            .find(|v| !v.is_empty())
    }

    /// Every non-empty match in `text`, in document order.
    pub fn capture_all(&self, text: &str) -> Vec<Link> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let url = caps.name("url").or_else(|| caps.get(1))?.as_str();
                if url.is_empty() {
                    return None;
                }
                let label = caps
                    .name("label")
                    .map(|m| unescape_html(m.as_str().trim()))
                    .filter(|l| !l.is_empty());
                Some(Link {
                    url: unescape_html(url),
                    label,
                })
            })
            .collect()
    }
}

fn compile(source: &str) -> Result<Regex> {
    Regex::new(source).map_err(|e| ResolveError::InvalidProfile(format!("bad pattern: {}", e)))
}

/// Undo the backslash escaping of JSON and script string literals, so
/// `U2Fs\/x` reads `U2Fs/x`. Unknown escapes are left as written.
pub fn unescape_js(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(e @ ('/' | '"' | '\'' | '\\' | '`')) => out.push(e),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == 4 && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                        out.push(decoded);
                        chars.nth(3);
                    }
                    _ => out.push_str("\\u"),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Undo the entity escaping found in attribute values.
fn unescape_html(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

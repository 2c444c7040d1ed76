//! Resolver endpoint responses.
//!
//! Endpoints answer a JSON object with a status flag and an encrypted
//! `data` field. Key spellings vary between sites (`success`, `sucess`,
//! `msg`), so bodies are normalized to canonical keys before typed parsing.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{ResolveError, Result, Stage};

/// Alternate keys every site profile gets for free.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("success", "status"),
    ("sucess", "status"),
    ("msg", "message"),
];

/// Keys in a decrypted payload that may hold the media URL, by preference.
const URL_KEYS: &[&str] = &["file", "url", "source", "link"];

/// A parsed resolver response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResolverResponse {
    #[serde(default, deserialize_with = "status_flag")]
    pub status: Option<bool>,
    #[serde(default)]
    pub data: Option<String>,
    /// Optional stream type discriminator.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ResolverResponse {
    /// Parse a response body, renaming alternate keys first.
    ///
    /// `aliases` maps a site's key to its canonical name. A rename never
    /// overwrites a canonical key that is already present.
    pub fn parse(body: &str, aliases: &BTreeMap<String, String>) -> Result<Self> {
        let value: Value = serde_json::from_str(body.trim()).map_err(|e| {
            ResolveError::upstream(Stage::ResolverResponse, format!("malformed JSON: {}", e))
        })?;

        let Value::Object(object) = value else {
            return Err(ResolveError::upstream(
                Stage::ResolverResponse,
                "response is not a JSON object",
            ));
        };

        let normalized = normalize(object, aliases);
        serde_json::from_value(Value::Object(normalized)).map_err(|e| {
            ResolveError::upstream(Stage::ResolverResponse, format!("unexpected shape: {}", e))
        })
    }

    /// Success per the status flag. A missing flag counts as success when
    /// data is present.
    pub fn is_success(&self) -> bool {
        match self.status {
            Some(ok) => ok,
            None => self.data.is_some(),
        }
    }

    /// The encrypted data field of a successful response.
    pub fn into_payload(self) -> Result<String> {
        if !self.is_success() {
            let detail = self
                .message
                .unwrap_or_else(|| "status indicates failure".to_string());
            return Err(ResolveError::upstream(Stage::ResolverResponse, detail));
        }

        match self.data {
            Some(data) if !data.trim().is_empty() => Ok(data),
            _ => Err(ResolveError::upstream(
                Stage::ResolverResponse,
                "missing data field",
            )),
        }
    }
}

fn normalize(mut object: Map<String, Value>, aliases: &BTreeMap<String, String>) -> Map<String, Value> {
    let builtin = BUILTIN_ALIASES.iter().map(|(a, c)| (*a, *c));
    let custom = aliases.iter().map(|(a, c)| (a.as_str(), c.as_str()));

    for (alias, canonical) in custom.chain(builtin) {
        if alias == canonical || object.contains_key(canonical) {
            continue;
        }
        if let Some(value) = object.remove(alias) {
            object.insert(canonical.to_string(), value);
        }
    }
    object
}

fn status_flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(flag))
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(*b),
        Value::Number(n) => {
            let code = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64));
            Some(code.map_or(false, |n| n == 1 || (200..300).contains(&n)))
        }
        Value::String(s) => Some(matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "ok" | "success" | "true" | "1" | "200"
        )),
        _ => Some(false),
    }
}

/// A media URL recovered from a decrypted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUrl {
    pub url: String,
    /// Type discriminator found next to the URL, if any.
    pub kind: Option<String>,
}

/// Pull the media URL out of decrypted response data.
///
/// The plaintext is either the URL itself (possibly JSON-quoted or with
/// escaped slashes), a JSON object with a `file`/`url`/`source`/`link` key,
/// or an array of such objects. Relative URLs are joined onto `origin`.
pub fn media_url(plaintext: &str, origin: &str) -> Result<MediaUrl> {
    let text = plaintext.trim();

    let (raw, kind) = match serde_json::from_str::<Value>(text) {
        Ok(Value::String(s)) => (s, None),
        Ok(value @ (Value::Object(_) | Value::Array(_))) => from_json(&value).ok_or_else(|| {
            ResolveError::extraction(Stage::StreamUrl, "decrypted data holds no media URL")
        })?,
        _ => (text.to_string(), None),
    };

    let raw = raw.replace("\\/", "/");
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ResolveError::extraction(
            Stage::StreamUrl,
            "decrypted data is empty",
        ));
    }

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(origin)
            .and_then(|base| base.join(raw))
            .map_err(|e| ResolveError::extraction(Stage::StreamUrl, format!("bad URL `{}`: {}", raw, e)))?,
        Err(e) => {
            return Err(ResolveError::extraction(
                Stage::StreamUrl,
                format!("bad URL `{}`: {}", raw, e),
            ))
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ResolveError::extraction(
            Stage::StreamUrl,
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }

    Ok(MediaUrl {
        url: url.into(),
        kind,
    })
}

fn from_json(value: &Value) -> Option<(String, Option<String>)> {
    match value {
        Value::String(s) if !s.is_empty() => Some((s.clone(), None)),
        Value::Object(object) => {
            let url = URL_KEYS
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_str))
                .filter(|s| !s.is_empty())?;
            let kind = object.get("type").and_then(Value::as_str).map(str::to_string);
            Some((url.to_string(), kind))
        }
        Value::Array(items) => items.iter().find_map(from_json),
        _ => None,
    }
}

//! Provider profiles: a site's resolution pipeline as configuration data.
//!
//! Sites differ in passphrases, endpoints, field names and which optional
//! steps they use, never in algorithm. A [`ProviderProfile`] captures those
//! differences so one [`Resolver`](crate::Resolver) serves every site.
//!
//! Profiles deserialize from JSON:
//!
//! ```json
//! {
//!   "name": "example",
//!   "base_url": "https://site.test",
//!   "servers": { "kind": "fixed", "embeds": ["{base}/embed/{episode}"] },
//!   "fields": [
//!     { "name": "idfile", "pattern": { "assignment": "idfile_enc" }, "passphrase": "k1" }
//!   ],
//!   "delivery": {
//!     "kind": "resolver",
//!     "endpoint": "{origin}/api/source",
//!     "payload": [{ "field": "idfile" }, "timestamp"],
//!     "passphrase": "k2",
//!     "response_passphrase": "k3"
//!   }
//! }
//! ```
//!
//! URL templates expand `{base}`, `{episode}`, `{origin}`, `{timestamp}` and
//! `{field:NAME}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ResolveError, Result};

/// One piece of a rendered string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    /// Fixed text.
    Literal(String),
    /// A field recovered from the embed page.
    Field(String),
    /// The opaque episode identifier.
    EpisodeId,
    /// Milliseconds since the Unix epoch, fixed per candidate.
    Timestamp,
}

/// How to find a value in page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPattern {
    /// A named assignment: `name = "v"`, `name: 'v'` or `"name":"v"`.
    Assignment(String),
    /// A regular expression; the first capture group is the value.
    Regex(String),
}

/// A form field sent with a server-listing POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    /// Concatenated without delimiter.
    pub value: Vec<Part>,
}

/// How delivery candidates ("servers") are enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerListing {
    /// Fixed embed URL templates, one candidate each.
    Fixed { embeds: Vec<String> },
    /// Fetch a listing and take every match of `pattern` as an embed URL.
    ///
    /// `pattern` may name groups `url` and `label`; otherwise group 1 is
    /// the URL. The listing is fetched with GET, or POST when `form` is set.
    Page {
        url: String,
        #[serde(default)]
        form: Vec<FormField>,
        pattern: String,
    },
}

/// A value captured from the embed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    /// Name the value is stored under for payload rendering.
    pub name: String,
    pub pattern: FieldPattern,
    /// When set, the captured text is an envelope sealed with this passphrase.
    #[serde(default)]
    pub passphrase: Option<String>,
}

/// Request signature settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSpec {
    /// Salt string appended to the ciphertext before hashing.
    pub salt: Vec<Part>,
}

/// The encrypted resolver exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSpec {
    /// Resolver endpoint template.
    pub endpoint: String,
    /// Form field carrying the payload.
    #[serde(default = "default_form_field")]
    pub form_field: String,
    /// Plaintext payload parts, joined by `delimiter`.
    pub payload: Vec<Part>,
    /// Separator between payload parts, and between ciphertext and signature.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Passphrase sealing the request payload.
    pub passphrase: String,
    #[serde(default)]
    pub signature: Option<SignatureSpec>,
    /// Passphrase opening the response `data` field.
    pub response_passphrase: String,
    /// Alternate response keys mapped to their canonical name
    /// (`status`, `data`, `type`, `message`).
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Where the final media URL comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delivery {
    /// The URL is a recovered embed field.
    Embedded { field: String },
    /// The URL comes back from an encrypted resolver exchange.
    Resolver(ResolverSpec),
}

/// A site's complete resolution pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Site identifier; also the base-URL cache key.
    pub name: String,
    /// Site root, or a bouncer URL when `bouncer` is set.
    pub base_url: String,
    /// `base_url` redirects to the live mirror; resolve it once and cache.
    #[serde(default)]
    pub bouncer: bool,
    /// Pattern for the episode id in episode-page text. Without it the
    /// episode reference itself is the id.
    #[serde(default)]
    pub episode: Option<FieldPattern>,
    pub servers: ServerListing,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
    pub delivery: Delivery,
    /// Referer template for playback. Defaults to `{origin}/`.
    #[serde(default)]
    pub referer: Option<String>,
}

impl ProviderProfile {
    /// Parse a profile from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ResolveError::InvalidProfile(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ResolveError::InvalidProfile(e.to_string()))
    }
}

fn default_form_field() -> String {
    "data".to_string()
}

fn default_delimiter() -> String {
    "|".to_string()
}

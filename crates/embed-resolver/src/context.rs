//! Per-candidate resolution state.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use crate::error::{ResolveError, Result, Stage};
use crate::profile::Part;

/// One delivery source for an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Human-readable name, used in logs and failure reports.
    pub label: String,
    /// Absolute embed page URL.
    pub embed_url: String,
}

impl Candidate {
    pub fn new(label: impl Into<String>, embed_url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            embed_url: embed_url.into(),
        }
    }
}

/// What the caller knows about the episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeRef {
    /// The opaque episode identifier itself.
    Id(String),
    /// An episode page. When `text` is `None` it is fetched.
    Page { url: String, text: Option<String> },
}

impl EpisodeRef {
    pub fn id(id: impl Into<String>) -> Self {
        EpisodeRef::Id(id.into())
    }

    pub fn page(url: impl Into<String>) -> Self {
        EpisodeRef::Page {
            url: url.into(),
            text: None,
        }
    }

    /// An episode page whose text the caller already fetched.
    pub fn page_with_text(url: impl Into<String>, text: impl Into<String>) -> Self {
        EpisodeRef::Page {
            url: url.into(),
            text: Some(text.into()),
        }
    }
}

/// State threaded through one candidate's steps.
///
/// Each candidate owns its context; nothing here is shared between
/// concurrent resolutions.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    /// Site root with no trailing slash.
    pub base_url: String,
    pub episode_id: String,
    pub candidate: Option<Candidate>,
    /// Scheme and host of the embed page, or of the site before a candidate
    /// is chosen.
    pub origin: String,
    /// Values recovered from the embed page, decrypted where configured.
    pub fields: HashMap<String, String>,
    /// Milliseconds since the Unix epoch, fixed for the candidate's lifetime.
    pub timestamp_ms: u64,
}

impl ResolutionContext {
    /// Context for the episode-level steps (server listing).
    pub fn new(base_url: impl Into<String>, episode_id: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let origin = origin_of(&base_url).unwrap_or_else(|| base_url.clone());
        Self {
            base_url,
            episode_id: episode_id.into(),
            candidate: None,
            origin,
            fields: HashMap::new(),
            timestamp_ms: now_millis(),
        }
    }

    /// A fresh context for one candidate, with its own origin and timestamp.
    pub fn for_candidate(&self, candidate: &Candidate) -> Result<Self> {
        let origin = origin_of(&candidate.embed_url).ok_or_else(|| {
            ResolveError::extraction(
                Stage::EmbedPage,
                format!("not an absolute URL: {}", candidate.embed_url),
            )
        })?;

        Ok(Self {
            base_url: self.base_url.clone(),
            episode_id: self.episode_id.clone(),
            candidate: Some(candidate.clone()),
            origin,
            fields: HashMap::new(),
            timestamp_ms: now_millis(),
        })
    }

    /// Pin the timestamp; used for reproducible payloads.
    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Label of the current candidate, or `"episode"` before one is chosen.
    pub fn label(&self) -> &str {
        self.candidate
            .as_ref()
            .map(|c| c.label.as_str())
            .unwrap_or("episode")
    }

    fn field(&self, name: &str, stage: Stage) -> Result<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ResolveError::extraction(stage, format!("field `{}` was not recovered", name)))
    }

    /// Render payload parts joined by `delimiter`.
    pub fn render(&self, parts: &[Part], delimiter: &str, stage: Stage) -> Result<String> {
        let mut pieces = Vec::with_capacity(parts.len());
        for part in parts {
            let piece = match part {
                Part::Literal(text) => text.clone(),
                Part::Field(name) => self.field(name, stage)?.to_string(),
                Part::EpisodeId => self.episode_id.clone(),
                Part::Timestamp => self.timestamp_ms.to_string(),
            };
            pieces.push(piece);
        }
        Ok(pieces.join(delimiter))
    }

    /// Expand `{base}`, `{episode}`, `{origin}`, `{timestamp}` and
    /// `{field:NAME}` in a URL template.
    pub fn expand(&self, template: &str, stage: Stage) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                ResolveError::InvalidProfile(format!("unclosed placeholder in `{}`", template))
            })?;
            let name = &after[..close];

            match name {
                "base" => out.push_str(&self.base_url),
                "episode" => out.push_str(&self.episode_id),
                "origin" => out.push_str(&self.origin),
                "timestamp" => out.push_str(&self.timestamp_ms.to_string()),
                _ => match name.strip_prefix("field:") {
                    Some(field) => out.push_str(self.field(field, stage)?),
                    None => {
                        return Err(ResolveError::InvalidProfile(format!(
                            "unknown placeholder `{{{}}}` in `{}`",
                            name, template
                        )))
                    }
                },
            }
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// `scheme://host[:port]` of an absolute URL.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ResolutionContext {
        let mut ctx = ResolutionContext::new("https://site.test/", "ep-42")
            .for_candidate(&Candidate::new("server 1", "https://embed.test:8443/e/1"))
            .unwrap()
            .with_timestamp(1_700_000_000_000);
        ctx.fields.insert("idfile".into(), "1234".into());
        ctx.fields.insert("idUser".into(), "5678".into());
        ctx
    }

    #[test]
    fn test_origin() {
        let ctx = context();
        assert_eq!(ctx.base_url, "https://site.test");
        assert_eq!(ctx.origin, "https://embed.test:8443");
        assert_eq!(ctx.label(), "server 1");
        assert_eq!(origin_of("not a url"), None);
    }

    #[test]
    fn test_render_payload() {
        let ctx = context();
        let payload = ctx
            .render(
                &[
                    Part::Field("idfile".into()),
                    Part::Field("idUser".into()),
                    Part::Timestamp,
                ],
                "|",
                Stage::Payload,
            )
            .unwrap();
        assert_eq!(payload, "1234|5678|1700000000000");
    }

    #[test]
    fn test_render_missing_field() {
        let err = context()
            .render(&[Part::Field("nope".into())], "|", Stage::Payload)
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ExtractionFailed {
                stage: Stage::Payload,
                ..
            }
        ));
    }

    #[test]
    fn test_expand() {
        let ctx = context();
        assert_eq!(
            ctx.expand("{origin}/api/{field:idfile}?ep={episode}&t={timestamp}", Stage::ResolverRequest)
                .unwrap(),
            "https://embed.test:8443/api/1234?ep=ep-42&t=1700000000000"
        );
        assert_eq!(ctx.expand("{base}/", Stage::EmbedPage).unwrap(), "https://site.test/");
    }

    #[test]
    fn test_expand_rejects_bad_templates() {
        let ctx = context();
        assert!(matches!(
            ctx.expand("{bogus}", Stage::EmbedPage),
            Err(ResolveError::InvalidProfile(_))
        ));
        assert!(matches!(
            ctx.expand("{base", Stage::EmbedPage),
            Err(ResolveError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_candidate_needs_absolute_url() {
        let ctx = ResolutionContext::new("https://site.test", "1");
        assert!(ctx.for_candidate(&Candidate::new("x", "/relative")).is_err());
    }
}

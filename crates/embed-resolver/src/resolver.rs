//! The Resolver: drives a site's multi-hop exchange from an episode reference
//! to playable streams.
//!
//! Per candidate the steps are strictly sequential: fetch the embed page,
//! recover and decrypt its fields, then either use a recovered field as the
//! media URL or run the encrypted resolver exchange (payload, envelope,
//! optional signature, POST, decrypt). Candidates for one episode run
//! concurrently and each owns its [`ResolutionContext`].

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use embed_resolver_core::{envelope, signature};
use embed_resolver_http::{headers, Form, Headers, HttpClient};

use crate::base_url::BaseUrlCache;
use crate::config::ResolverConfig;
use crate::context::{origin_of, Candidate, EpisodeRef, ResolutionContext};
use crate::error::{CandidateFailure, ResolveError, Result, Stage};
use crate::extract::{unescape_js, Extractor};
use crate::profile::{Delivery, EmbedField, Part, ProviderProfile, ResolverSpec, ServerListing};
use crate::response::{media_url, MediaUrl, ResolverResponse};
use crate::stream::{ResolvedStream, StreamKind};

/// Keys that wrap listing markup in JSON listing responses.
const LISTING_KEYS: &[&str] = &["html", "result", "data"];

/// Resolves episodes for one provider profile.
pub struct Resolver {
    /// The site's pipeline description.
    profile: ProviderProfile,
    /// Shared transport.
    http: Arc<dyn HttpClient>,
    config: ResolverConfig,
    /// Bouncer lookups; process-wide unless replaced.
    base_urls: Arc<BaseUrlCache>,
    episode: Option<Extractor>,
    listing: Option<Extractor>,
    fields: Vec<(EmbedField, Extractor)>,
}

impl Resolver {
    /// Create a resolver, compiling the profile's patterns.
    pub fn new(
        profile: ProviderProfile,
        http: Arc<dyn HttpClient>,
        config: ResolverConfig,
    ) -> Result<Self> {
        validate(&profile)?;

        let episode = profile.episode.as_ref().map(Extractor::compile).transpose()?;
        let listing = match &profile.servers {
            ServerListing::Page { pattern, .. } => Some(Extractor::regex(pattern)?),
            ServerListing::Fixed { .. } => None,
        };
        let fields = profile
            .fields
            .iter()
            .map(|field| Ok((field.clone(), Extractor::compile(&field.pattern)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            profile,
            http,
            config,
            base_urls: BaseUrlCache::global(),
            episode,
            listing,
            fields,
        })
    }

    /// Use a private base-URL cache instead of the process-wide one.
    pub fn with_base_url_cache(mut self, cache: Arc<BaseUrlCache>) -> Self {
        self.base_urls = cache;
        self
    }

    /// Get the profile.
    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    /// Get the configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Episode-level steps
    // ─────────────────────────────────────────────────────────────────────────

    /// The site root, following the bouncer once per process when the
    /// profile has one.
    pub async fn base_url(&self) -> Result<String> {
        if !self.profile.bouncer {
            return Ok(self.profile.base_url.trim_end_matches('/').to_string());
        }

        self.base_urls
            .get_or_resolve(&self.profile.name, || async {
                debug!(site = %self.profile.name, bouncer = %self.profile.base_url, "Following bouncer");
                let landing = self
                    .http
                    .final_url(&self.profile.base_url, &Headers::new())
                    .await
                    .map_err(|source| ResolveError::Http {
                        stage: Stage::BaseUrl,
                        source,
                    })?;
                origin_of(&landing).ok_or_else(|| {
                    ResolveError::extraction(
                        Stage::BaseUrl,
                        format!("bouncer landed on `{}`", landing),
                    )
                })
            })
            .await
    }

    /// Forget the cached bouncer target so the next call follows it again.
    pub fn invalidate_base_url(&self) {
        self.base_urls.invalidate(&self.profile.name);
    }

    /// The opaque episode identifier.
    pub async fn episode_id(&self, episode: &EpisodeRef, base_url: &str) -> Result<String> {
        let id = match episode {
            EpisodeRef::Id(id) => id.trim().to_string(),
            EpisodeRef::Page { url, text } => {
                let extractor = self.episode.as_ref().ok_or_else(|| {
                    ResolveError::InvalidProfile(format!(
                        "profile `{}` has no episode pattern for page references",
                        self.profile.name
                    ))
                })?;

                let fetched;
                let text = match text {
                    Some(text) => text.as_str(),
                    None => {
                        fetched = self
                            .http
                            .get(url, &referer(base_url))
                            .await
                            .map_err(|source| ResolveError::Http {
                                stage: Stage::EpisodeId,
                                source,
                            })?;
                        fetched.as_str()
                    }
                };

                extractor
                    .capture(text)
                    .map(|id| id.trim().to_string())
                    .ok_or_else(|| {
                        ResolveError::extraction(
                            Stage::EpisodeId,
                            format!("`{}` not found in {}", extractor.label(), url),
                        )
                    })?
            }
        };

        if id.is_empty() {
            return Err(ResolveError::extraction(Stage::EpisodeId, "empty episode id"));
        }
        Ok(id)
    }

    /// Base URL, episode id and the candidate list, in one step.
    pub async fn prepare(&self, episode: &EpisodeRef) -> Result<(ResolutionContext, Vec<Candidate>)> {
        let base_url = self.base_url().await?;
        let episode_id = self.episode_id(episode, &base_url).await?;
        let ctx = ResolutionContext::new(base_url, episode_id);
        let candidates = self.candidates(&ctx).await?;
        Ok((ctx, candidates))
    }

    /// Enumerate delivery candidates ("servers") for the episode.
    pub async fn candidates(&self, ctx: &ResolutionContext) -> Result<Vec<Candidate>> {
        let candidates = match &self.profile.servers {
            ServerListing::Fixed { embeds } => embeds
                .iter()
                .enumerate()
                .map(|(i, template)| {
                    let url = ctx.expand(template, Stage::ServerList)?;
                    Ok(Candidate::new(format!("server {}", i + 1), url))
                })
                .collect::<Result<Vec<_>>>()?,
            ServerListing::Page { url, form, .. } => {
                let listing_url = ctx.expand(url, Stage::ServerList)?;
                let mut request_headers = referer(&ctx.base_url);
                request_headers.insert("X-Requested-With".into(), "XMLHttpRequest".into());

                let sent = if form.is_empty() {
                    self.http.get(&listing_url, &request_headers).await
                } else {
                    let form = form
                        .iter()
                        .map(|field| Ok((field.name.clone(), ctx.render(&field.value, "", Stage::ServerList)?)))
                        .collect::<Result<Form>>()?;
                    self.http.post_form(&listing_url, &form, &request_headers).await
                };
                let body = sent.map_err(|source| ResolveError::Http {
                    stage: Stage::ServerList,
                    source,
                })?;

                self.parse_listing(&body, &listing_url)
            }
        };

        if candidates.is_empty() {
            return Err(ResolveError::extraction(Stage::ServerList, "no servers listed"));
        }
        debug!(count = candidates.len(), "Listed candidates");
        Ok(candidates)
    }

    fn parse_listing(&self, body: &str, listing_url: &str) -> Vec<Candidate> {
        let Some(extractor) = &self.listing else {
            return Vec::new();
        };

        let markup = listing_markup(body);
        let base = Url::parse(listing_url).ok();
        let mut seen = HashSet::new();

        extractor
            .capture_all(&markup)
            .into_iter()
            .filter_map(|link| {
                let absolute = match &base {
                    Some(base) => base.join(&link.url).ok()?.to_string(),
                    None => link.url,
                };
                Some((absolute, link.label))
            })
            .filter(|(url, _)| seen.insert(url.clone()))
            .enumerate()
            .map(|(i, (url, label))| {
                Candidate::new(label.unwrap_or_else(|| format!("server {}", i + 1)), url)
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-candidate steps
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve one candidate to a stream.
    pub async fn resolve_candidate(
        &self,
        episode_ctx: &ResolutionContext,
        candidate: &Candidate,
    ) -> Result<ResolvedStream> {
        let mut ctx = episode_ctx.for_candidate(candidate)?;
        debug!(candidate = %candidate.label, url = %candidate.embed_url, "Fetching embed page");

        let page = self
            .http
            .get(&candidate.embed_url, &referer(&ctx.base_url))
            .await
            .map_err(|source| ResolveError::Http {
                stage: Stage::EmbedPage,
                source,
            })?;

        self.recover_fields(&mut ctx, &page)?;

        let media = match &self.profile.delivery {
            Delivery::Embedded { field } => {
                let value = ctx.fields.get(field).ok_or_else(|| {
                    ResolveError::extraction(Stage::StreamUrl, format!("field `{}` was not recovered", field))
                })?;
                media_url(value, &ctx.origin)?
            }
            Delivery::Resolver(spec) => self.exchange(&ctx, spec).await?,
        };

        let referer_template = self.profile.referer.as_deref().unwrap_or("{origin}/");
        let stream_headers = headers([
            ("Referer", ctx.expand(referer_template, Stage::StreamUrl)?),
            ("Origin", ctx.origin.clone()),
        ]);

        Ok(ResolvedStream {
            kind: StreamKind::infer(&media.url, media.kind.as_deref()),
            url: media.url,
            headers: stream_headers,
            source: candidate.label.clone(),
        })
    }

    /// Capture every configured field from the embed page and decrypt the
    /// sealed ones.
    fn recover_fields(&self, ctx: &mut ResolutionContext, page: &str) -> Result<()> {
        for (field, extractor) in &self.fields {
            let raw = extractor.capture(page).ok_or_else(|| {
                ResolveError::extraction(
                    Stage::FieldExtraction,
                    format!("`{}` not found", extractor.label()),
                )
            })?;
            let raw = unescape_js(raw);

            let value = match &field.passphrase {
                Some(passphrase) => envelope::unwrap_str(&raw, passphrase.as_str())
                    .map_err(|source| ResolveError::Crypto {
                        stage: Stage::FieldDecrypt,
                        source,
                    })?,
                None => raw,
            };

            debug!(candidate = %ctx.label(), field = %field.name, "Recovered field");
            ctx.fields.insert(field.name.clone(), value.trim().to_string());
        }
        Ok(())
    }

    /// The encrypted resolver exchange.
    async fn exchange(&self, ctx: &ResolutionContext, spec: &ResolverSpec) -> Result<MediaUrl> {
        let payload = ctx.render(&spec.payload, &spec.delimiter, Stage::Payload)?;
        let ciphertext = envelope::wrap(payload.as_bytes(), spec.passphrase.as_str()).map_err(|source| {
            ResolveError::Crypto {
                stage: Stage::PayloadEncrypt,
                source,
            }
        })?;

        let value = match &spec.signature {
            Some(sig) => {
                let salt = ctx.render(&sig.salt, "", Stage::Signature)?;
                let digest = signature::sign(&ciphertext, &salt);
                format!("{}{}{}", ciphertext, spec.delimiter, digest)
            }
            None => ciphertext,
        };

        let endpoint = ctx.expand(&spec.endpoint, Stage::ResolverRequest)?;
        let embed_url = ctx
            .candidate
            .as_ref()
            .map(|c| c.embed_url.clone())
            .unwrap_or_else(|| format!("{}/", ctx.origin));
        let request_headers = headers([
            ("Referer", embed_url),
            ("Origin", ctx.origin.clone()),
            ("X-Requested-With", "XMLHttpRequest".to_string()),
        ]);
        let form: Form = vec![(spec.form_field.clone(), value)];

        debug!(candidate = %ctx.label(), endpoint = %endpoint, "Posting resolver request");
        let body = self
            .http
            .post_form(&endpoint, &form, &request_headers)
            .await
            .map_err(|source| ResolveError::Http {
                stage: Stage::ResolverRequest,
                source,
            })?;

        let response = ResolverResponse::parse(&body, &spec.aliases)?;
        let kind = response.kind.clone();
        let data = response.into_payload()?;

        let plaintext = envelope::unwrap_str(&data, spec.response_passphrase.as_str()).map_err(|source| {
            ResolveError::Crypto {
                stage: Stage::ResponseDecrypt,
                source,
            }
        })?;

        let mut media = media_url(&plaintext, &ctx.origin)?;
        media.kind = media.kind.or(kind);
        Ok(media)
    }

    async fn run_candidate(&self, ctx: &ResolutionContext, candidate: &Candidate) -> Result<ResolvedStream> {
        let attempt = self.resolve_candidate(ctx, candidate);
        match self.config.candidate_timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ResolveError::Timeout(limit)),
            },
            None => attempt.await,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fan-out
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve every candidate concurrently, calling `emit` for each stream
    /// as it completes. Returns the number of streams emitted.
    ///
    /// Fails with [`ResolveError::ResolutionFailed`] only when nothing was
    /// emitted. Dropping the returned future cancels candidates still in
    /// flight at their next network call.
    pub async fn resolve_with<F>(&self, episode: &EpisodeRef, mut emit: F) -> Result<usize>
    where
        F: FnMut(ResolvedStream),
    {
        let (ctx, candidates) = match self.prepare(episode).await {
            Ok(prepared) => prepared,
            Err(error) => {
                let step = error
                    .stage()
                    .map(|stage| stage.to_string())
                    .unwrap_or_else(|| "episode".to_string());
                warn!(site = %self.profile.name, error = %error, "Resolution failed before fan-out");
                return Err(ResolveError::ResolutionFailed {
                    failures: vec![CandidateFailure::new(step, error)],
                });
            }
        };

        let total = candidates.len();
        let ctx = &ctx;
        let mut outcomes = stream::iter(candidates.into_iter().map(|candidate| async move {
            let outcome = self.run_candidate(ctx, &candidate).await;
            (candidate, outcome)
        }))
        .buffer_unordered(self.config.max_concurrent_candidates.max(1));

        let mut emitted = 0;
        let mut failures = Vec::new();

        while let Some((candidate, outcome)) = outcomes.next().await {
            match outcome {
                Ok(stream) => {
                    info!(
                        site = %self.profile.name,
                        candidate = %candidate.label,
                        kind = ?stream.kind,
                        "Resolved stream"
                    );
                    emitted += 1;
                    emit(stream);
                }
                Err(error) => {
                    warn!(
                        site = %self.profile.name,
                        candidate = %candidate.label,
                        error = %error,
                        "Candidate failed"
                    );
                    failures.push(CandidateFailure::new(candidate.label, error));
                }
            }
        }

        if emitted == 0 {
            return Err(ResolveError::ResolutionFailed { failures });
        }
        debug!(emitted, failed = failures.len(), total, "Resolution finished");
        Ok(emitted)
    }

    /// Resolve every candidate and collect the streams in completion order.
    pub async fn resolve(&self, episode: &EpisodeRef) -> Result<Vec<ResolvedStream>> {
        let mut streams = Vec::new();
        self.resolve_with(episode, |stream| streams.push(stream)).await?;
        Ok(streams)
    }
}

/// Reject profiles whose parts name fields the embed page never provides,
/// or that need a field before any embed page has been fetched.
fn validate(profile: &ProviderProfile) -> Result<()> {
    let invalid = |what: String| Err(ResolveError::InvalidProfile(format!("profile `{}` {}", profile.name, what)));

    // Episode-level strings are expanded before any embed page exists.
    let mut episode_level: Vec<&str> = Vec::new();
    match &profile.servers {
        ServerListing::Fixed { embeds } => {
            episode_level.extend(embeds.iter().flat_map(|t| template_fields(t)));
        }
        ServerListing::Page { url, form, .. } => {
            episode_level.extend(template_fields(url));
            episode_level.extend(form.iter().flat_map(|f| part_fields(&f.value)));
        }
    }
    if let Some(name) = episode_level.first() {
        return invalid(format!("lists servers with field `{}`, which is only known per candidate", name));
    }

    let mut referenced: Vec<&str> = Vec::new();
    match &profile.delivery {
        Delivery::Embedded { field } => referenced.push(field),
        Delivery::Resolver(spec) => {
            referenced.extend(part_fields(&spec.payload));
            referenced.extend(template_fields(&spec.endpoint));
            if let Some(sig) = &spec.signature {
                referenced.extend(part_fields(&sig.salt));
            }
        }
    }
    if let Some(template) = &profile.referer {
        referenced.extend(template_fields(template));
    }

    let declared: HashSet<&str> = profile.fields.iter().map(|f| f.name.as_str()).collect();
    match referenced.into_iter().find(|name| !declared.contains(name)) {
        Some(name) => invalid(format!("uses undeclared field `{}`", name)),
        None => Ok(()),
    }
}

fn part_fields(parts: &[Part]) -> impl Iterator<Item = &str> {
    parts.iter().filter_map(|part| match part {
        Part::Field(name) => Some(name.as_str()),
        _ => None,
    })
}

/// Names in `{field:NAME}` placeholders.
fn template_fields(template: &str) -> impl Iterator<Item = &str> {
    template
        .split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}'))
        .filter_map(|(name, _)| name.strip_prefix("field:"))
}

fn referer(base_url: &str) -> Headers {
    headers([("Referer", format!("{}/", base_url.trim_end_matches('/')))])
}

/// Listing endpoints often answer `{"html": "<markup>"}`; unwrap that.
fn listing_markup(body: &str) -> String {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body.trim()) {
        if let Some(markup) = LISTING_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
        {
            return markup.to_string();
        }
    }
    body.to_string()
}

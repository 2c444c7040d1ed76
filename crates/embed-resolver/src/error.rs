//! Error types for the resolver.

use std::fmt;
use std::time::Duration;

use embed_resolver_core::CryptoError;
use embed_resolver_http::HttpError;
use thiserror::Error;

/// The pipeline step an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    BaseUrl,
    EpisodeId,
    ServerList,
    EmbedPage,
    FieldExtraction,
    FieldDecrypt,
    Payload,
    PayloadEncrypt,
    Signature,
    ResolverRequest,
    ResolverResponse,
    ResponseDecrypt,
    StreamUrl,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::BaseUrl => "base URL lookup",
            Stage::EpisodeId => "episode id extraction",
            Stage::ServerList => "server listing",
            Stage::EmbedPage => "embed page fetch",
            Stage::FieldExtraction => "field extraction",
            Stage::FieldDecrypt => "field decryption",
            Stage::Payload => "payload construction",
            Stage::PayloadEncrypt => "payload encryption",
            Stage::Signature => "request signature",
            Stage::ResolverRequest => "resolver request",
            Stage::ResolverResponse => "resolver response",
            Stage::ResponseDecrypt => "response decryption",
            Stage::StreamUrl => "stream URL",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while resolving an episode.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// An expected field or pattern was absent from fetched text.
    #[error("{stage}: {detail}")]
    ExtractionFailed { stage: Stage, detail: String },

    /// Envelope or cipher failure (wrong passphrase, corrupted input).
    #[error("{stage}: {source}")]
    Crypto {
        stage: Stage,
        #[source]
        source: CryptoError,
    },

    /// The resolver endpoint reported failure or answered malformed data.
    #[error("{stage}: upstream error: {detail}")]
    Upstream { stage: Stage, detail: String },

    /// Transport failure.
    #[error("{stage}: {source}")]
    Http {
        stage: Stage,
        #[source]
        source: HttpError,
    },

    /// A candidate did not finish within the configured limit.
    #[error("candidate timed out after {0:?}")]
    Timeout(Duration),

    /// The provider profile is unusable (bad regex, unknown placeholder).
    #[error("invalid provider profile: {0}")]
    InvalidProfile(String),

    /// Every candidate failed; carries each failure for diagnostics.
    #[error("no playable source found ({} failed)", .failures.len())]
    ResolutionFailed { failures: Vec<CandidateFailure> },
}

impl ResolveError {
    pub(crate) fn extraction(stage: Stage, detail: impl Into<String>) -> Self {
        ResolveError::ExtractionFailed {
            stage,
            detail: detail.into(),
        }
    }

    pub(crate) fn upstream(stage: Stage, detail: impl Into<String>) -> Self {
        ResolveError::Upstream {
            stage,
            detail: detail.into(),
        }
    }

    /// The stage this error came from, when it belongs to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ResolveError::ExtractionFailed { stage, .. }
            | ResolveError::Crypto { stage, .. }
            | ResolveError::Upstream { stage, .. }
            | ResolveError::Http { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Why one candidate could not be resolved.
#[derive(Debug)]
pub struct CandidateFailure {
    /// Candidate label (or the step name for failures before fan-out).
    pub candidate: String,
    pub error: ResolveError,
}

impl CandidateFailure {
    pub fn new(candidate: impl Into<String>, error: ResolveError) -> Self {
        Self {
            candidate: candidate.into(),
            error,
        }
    }
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.candidate, self.error)
    }
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

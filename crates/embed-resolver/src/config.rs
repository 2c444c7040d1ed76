//! Resolver configuration.

use std::env;
use std::time::Duration;

/// Environment variable overriding [`ResolverConfig::max_concurrent_candidates`].
pub const ENV_MAX_CONCURRENCY: &str = "EMBED_RESOLVER_MAX_CONCURRENCY";

/// Environment variable overriding [`ResolverConfig::candidate_timeout`], in
/// milliseconds. `0` disables the limit.
pub const ENV_CANDIDATE_TIMEOUT_MS: &str = "EMBED_RESOLVER_CANDIDATE_TIMEOUT_MS";

/// Configuration for a [`Resolver`](crate::Resolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Candidates resolved at the same time.
    pub max_concurrent_candidates: usize,
    /// Per-candidate time limit. `None` waits indefinitely.
    pub candidate_timeout: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_concurrent_candidates: 4,
            candidate_timeout: Some(Duration::from_secs(20)),
        }
    }
}

impl ResolverConfig {
    /// Load from environment variables, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_concurrent_candidates = env::var(ENV_MAX_CONCURRENCY)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_concurrent_candidates);

        let candidate_timeout = match env::var(ENV_CANDIDATE_TIMEOUT_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => defaults.candidate_timeout,
        };

        Self {
            max_concurrent_candidates,
            candidate_timeout,
        }
    }

    /// Set the concurrency limit. Zero is treated as one.
    pub fn with_max_concurrent_candidates(mut self, n: usize) -> Self {
        self.max_concurrent_candidates = n.max(1);
        self
    }

    /// Set or clear the per-candidate time limit.
    pub fn with_candidate_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.candidate_timeout = timeout;
        self
    }
}

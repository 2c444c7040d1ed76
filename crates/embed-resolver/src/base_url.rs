//! Single-flight memoized base-URL lookup for bouncer sites.
//!
//! Some sites publish a fixed bouncer URL that redirects to the current
//! mirror. The mirror is resolved once per process per site; concurrent
//! callers await the same in-flight lookup instead of each following the
//! redirect.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::sync::OnceCell;

/// Cache of resolved base URLs, keyed by site.
#[derive(Debug, Default)]
pub struct BaseUrlCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl BaseUrlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> Arc<BaseUrlCache> {
        static GLOBAL: OnceLock<Arc<BaseUrlCache>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(BaseUrlCache::new())).clone()
    }

    fn cell(&self, site: &str) -> Arc<OnceCell<String>> {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(site.to_string())
            .or_default()
            .clone()
    }

    /// The cached URL for `site`, or the result of `resolve`.
    ///
    /// Only one `resolve` runs at a time per site. A failed lookup is not
    /// cached; the next caller tries again.
    pub async fn get_or_resolve<F, Fut, E>(&self, site: &str, resolve: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let cell = self.cell(site);
        let url = cell.get_or_try_init(resolve).await?;
        Ok(url.clone())
    }

    /// The cached URL for `site`, if resolved.
    pub fn get(&self, site: &str) -> Option<String> {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(site)
            .and_then(|cell| cell.get().cloned())
    }

    /// Forget `site` so the next lookup resolves again.
    ///
    /// A lookup already in flight finishes into the discarded cell.
    pub fn invalidate(&self, site: &str) {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(site);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_flight() {
        let cache = Arc::new(BaseUrlCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let lookups = (0..8).map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cache
                    .get_or_resolve("site", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, ()>("https://mirror.test".to_string())
                    })
                    .await
            })
        });

        for lookup in futures::future::join_all(lookups).await {
            assert_eq!(lookup.unwrap().unwrap(), "https://mirror.test");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("site").as_deref(), Some("https://mirror.test"));
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = BaseUrlCache::new();

        let first: Result<String, &str> = cache.get_or_resolve("site", || async { Err("down") }).await;
        assert_eq!(first, Err("down"));
        assert_eq!(cache.get("site"), None);

        let second: Result<String, &str> = cache
            .get_or_resolve("site", || async { Ok("https://a.test".to_string()) })
            .await;
        assert_eq!(second.unwrap(), "https://a.test");
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = BaseUrlCache::new();
        let _ = cache
            .get_or_resolve("site", || async { Ok::<_, ()>("https://a.test".to_string()) })
            .await;
        cache.invalidate("site");
        assert_eq!(cache.get("site"), None);

        let url = cache
            .get_or_resolve("site", || async { Ok::<_, ()>("https://b.test".to_string()) })
            .await
            .unwrap();
        assert_eq!(url, "https://b.test");
    }
}

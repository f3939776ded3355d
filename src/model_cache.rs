//! Time-boxed cache in front of the model listing call.
//!
//! The cache backs interactive listing and tab completion, where answering
//! quickly with a slightly stale list beats a round trip on every keystroke.
//! Refresh failures are therefore never surfaced to the caller.

use std::time::{Duration, Instant};

use crate::client::Backend;
use crate::observability::{MODEL_CACHE_HITS, MODEL_CACHE_REFRESH_FAILURES, MODEL_CACHE_REFRESHES};
use crate::types::ModelName;

/// Default time a fetched model list stays fresh.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(300);

/// One fetched model list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCacheEntry {
    /// Model names, sorted ascending.
    pub names: Vec<ModelName>,
    /// When the list was fetched.
    pub fetched_at: Instant,
}

/// Caches the host's model list for a fixed duration.
#[derive(Debug, Clone)]
pub struct ModelCache {
    entry: Option<ModelCacheEntry>,
    cache_duration: Duration,
}

impl ModelCache {
    /// Creates an empty cache with the default duration.
    pub fn new() -> Self {
        Self::with_duration(DEFAULT_CACHE_DURATION)
    }

    /// Creates an empty cache whose entries stay fresh for `cache_duration`.
    pub fn with_duration(cache_duration: Duration) -> Self {
        Self {
            entry: None,
            cache_duration,
        }
    }

    /// How long an entry stays fresh.
    pub fn cache_duration(&self) -> Duration {
        self.cache_duration
    }

    /// Returns the model list, fetching it if needed.
    ///
    /// A fetch happens when `force_refresh` is set, when nothing has been
    /// fetched yet, or when the current entry is older than the cache
    /// duration.  If the fetch fails the previous list is returned, or an
    /// empty list when there is none.
    pub async fn get_models(&mut self, backend: &dyn Backend, force_refresh: bool) -> Vec<ModelName> {
        self.get_models_at(backend, force_refresh, Instant::now())
            .await
    }

    /// [`ModelCache::get_models`] with an explicit notion of "now".
    pub async fn get_models_at(
        &mut self,
        backend: &dyn Backend,
        force_refresh: bool,
        now: Instant,
    ) -> Vec<ModelName> {
        if !force_refresh
            && let Some(entry) = &self.entry
            && now.saturating_duration_since(entry.fetched_at) <= self.cache_duration
        {
            MODEL_CACHE_HITS.click();
            return entry.names.clone();
        }

        match backend.list_models().await {
            Ok(mut names) => {
                MODEL_CACHE_REFRESHES.click();
                names.sort();
                names.dedup();
                self.entry = Some(ModelCacheEntry {
                    names: names.clone(),
                    fetched_at: now,
                });
                names
            }
            Err(err) => {
                MODEL_CACHE_REFRESH_FAILURES.click();
                tracing::debug!(error = %err, "model list refresh failed; serving cached list");
                self.cached().to_vec()
            }
        }
    }

    /// The last fetched list without touching the network; empty if none.
    pub fn cached(&self) -> &[ModelName] {
        self.entry
            .as_ref()
            .map(|entry| entry.names.as_slice())
            .unwrap_or(&[])
    }

    /// The current entry, if any.
    pub fn entry(&self) -> Option<&ModelCacheEntry> {
        self.entry.as_ref()
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The outcome of matching a typed model name against known names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResolution {
    /// The query equals a known name.
    Exact(ModelName),
    /// The query is a prefix of exactly one known name.
    UniquePrefix(ModelName),
    /// The query is a prefix of several names, listed in order.
    Ambiguous(Vec<ModelName>),
    /// Nothing matches.
    NotFound,
}

impl ModelResolution {
    /// The resolved name, if resolution succeeded.
    pub fn resolved(&self) -> Option<&str> {
        match self {
            ModelResolution::Exact(name) | ModelResolution::UniquePrefix(name) => Some(name),
            ModelResolution::Ambiguous(_) | ModelResolution::NotFound => None,
        }
    }
}

/// Resolves `query` against `names`: an exact match wins outright, then a
/// unique prefix match.
pub fn resolve_model(query: &str, names: &[ModelName]) -> ModelResolution {
    if let Some(exact) = names.iter().find(|name| name.as_str() == query) {
        return ModelResolution::Exact(exact.clone());
    }
    let mut matches: Vec<ModelName> = names
        .iter()
        .filter(|name| name.starts_with(query))
        .cloned()
        .collect();
    match matches.len() {
        0 => ModelResolution::NotFound,
        1 => ModelResolution::UniquePrefix(matches.remove(0)),
        _ => ModelResolution::Ambiguous(matches),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChunkStream;
    use crate::types::Message;
    use crate::{Error, Result};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        fetches: AtomicUsize,
        responses: Mutex<Vec<Result<Vec<ModelName>>>>,
    }

    impl CountingBackend {
        fn new(mut responses: Vec<Result<Vec<ModelName>>>) -> Self {
            responses.reverse();
            Self {
                fetches: AtomicUsize::new(0),
                responses: Mutex::new(responses),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Backend for CountingBackend {
        async fn list_models(&self) -> Result<Vec<ModelName>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(Error::connection("no more responses", None)))
        }

        async fn chat(&self, _: &[Message]) -> Result<ChunkStream> {
            Err(Error::unknown("not used"))
        }

        fn model(&self) -> &str {
            "llama3"
        }

        fn set_model(&mut self, _: ModelName) {}
    }

    fn names(names: &[&str]) -> Vec<ModelName> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn two_calls_within_window_fetch_once() {
        let backend = CountingBackend::new(vec![Ok(names(&["llama3", "llama2"]))]);
        let mut cache = ModelCache::new();
        let start = Instant::now();

        let first = cache.get_models_at(&backend, false, start).await;
        let second = cache
            .get_models_at(&backend, false, start + Duration::from_secs(299))
            .await;

        assert_eq!(first, names(&["llama2", "llama3"]));
        assert_eq!(second, first);
        assert_eq!(backend.fetches(), 1);
    }

    #[tokio::test]
    async fn call_after_window_refetches() {
        let backend = CountingBackend::new(vec![
            Ok(names(&["llama2"])),
            Ok(names(&["llama2", "phi3"])),
        ]);
        let mut cache = ModelCache::with_duration(Duration::from_secs(60));
        let start = Instant::now();

        cache.get_models_at(&backend, false, start).await;
        let later = cache
            .get_models_at(&backend, false, start + Duration::from_secs(61))
            .await;

        assert_eq!(backend.fetches(), 2);
        assert_eq!(later, names(&["llama2", "phi3"]));
        assert_eq!(
            cache.entry().unwrap().fetched_at,
            start + Duration::from_secs(61)
        );
    }

    #[tokio::test]
    async fn force_refresh_bypasses_fresh_entry() {
        let backend = CountingBackend::new(vec![Ok(names(&["a"])), Ok(names(&["b"]))]);
        let mut cache = ModelCache::new();
        let start = Instant::now();

        cache.get_models_at(&backend, false, start).await;
        let forced = cache.get_models_at(&backend, true, start).await;

        assert_eq!(backend.fetches(), 2);
        assert_eq!(forced, names(&["b"]));
    }

    #[tokio::test]
    async fn failed_refresh_returns_stale_entry() {
        let backend = CountingBackend::new(vec![
            Ok(names(&["llama3"])),
            Err(Error::connection("refused", None)),
        ]);
        let mut cache = ModelCache::with_duration(Duration::from_secs(1));
        let start = Instant::now();

        cache.get_models_at(&backend, false, start).await;
        let stale = cache
            .get_models_at(&backend, false, start + Duration::from_secs(5))
            .await;

        assert_eq!(stale, names(&["llama3"]));
        assert_eq!(backend.fetches(), 2);
    }

    #[tokio::test]
    async fn failed_first_fetch_returns_empty() {
        let backend = CountingBackend::new(vec![Err(Error::api(500, "down"))]);
        let mut cache = ModelCache::new();

        assert!(cache.get_models(&backend, false).await.is_empty());
        assert!(cache.cached().is_empty());
        assert!(cache.entry().is_none());
    }

    #[test]
    fn resolve_ambiguous_prefix() {
        let known = names(&["llama2", "llama3"]);
        assert_eq!(
            resolve_model("llama", &known),
            ModelResolution::Ambiguous(names(&["llama2", "llama3"]))
        );
    }

    #[test]
    fn resolve_exact() {
        let known = names(&["llama2", "llama3"]);
        assert_eq!(
            resolve_model("llama3", &known),
            ModelResolution::Exact("llama3".to_string())
        );
    }

    #[test]
    fn resolve_not_found() {
        let known = names(&["llama2", "llama3"]);
        assert_eq!(resolve_model("gpt", &known), ModelResolution::NotFound);
        assert!(resolve_model("gpt", &known).resolved().is_none());
    }

    #[test]
    fn resolve_unique_prefix() {
        let known = names(&["codellama:7b", "llama3"]);
        let resolution = resolve_model("code", &known);
        assert_eq!(
            resolution,
            ModelResolution::UniquePrefix("codellama:7b".to_string())
        );
        assert_eq!(resolution.resolved(), Some("codellama:7b"));
    }

    #[test]
    fn exact_match_beats_longer_prefix_matches() {
        let known = names(&["llama3", "llama3:70b", "llama3:8b"]);
        assert_eq!(
            resolve_model("llama3", &known),
            ModelResolution::Exact("llama3".to_string())
        );
    }
}

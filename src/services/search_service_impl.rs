//! Cache-aside implementation of [`SearchService`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::types::{
    AutocompleteResponse, FarmerSearchResponse, GrantSearchResponse, Pagination,
    SuggestionListResponse,
};
use crate::cache::{CacheKey, QueryCache};
use crate::config::Config;
use crate::db::Store;
use crate::index::SearchIndex;
use crate::models::search::{
    AutocompleteQuery, FarmerSearchQuery, GrantSearchQuery, SuggestionQuery,
};

use super::search_service::{SearchError, SearchService};
use super::suggestions::SuggestionSource;

/// Upper bound on options returned by the distinct-value suggestion path.
pub const SUGGESTION_LIST_LIMIT: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Farmer and grant listings.
    pub search_ttl: Duration,
    /// Autocomplete and suggestion lookups.
    pub suggestion_ttl: Duration,
    pub completion_limit: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            search_ttl: Duration::from_secs(300),
            suggestion_ttl: Duration::from_secs(600),
            completion_limit: 10,
        }
    }
}

impl CachePolicy {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            search_ttl: Duration::from_secs(config.cache.search_ttl_seconds),
            suggestion_ttl: Duration::from_secs(config.cache.suggestion_ttl_seconds),
            completion_limit: config.search_index.completion_limit,
        }
    }
}

/// Query engine: canonical key, cache lookup, backend on miss, cache fill.
pub struct CachedSearchService {
    store: Store,
    cache: Arc<dyn QueryCache>,
    completion: SuggestionSource,
    policy: CachePolicy,
}

impl CachedSearchService {
    #[must_use]
    pub fn new(
        store: Store,
        cache: Arc<dyn QueryCache>,
        index: Option<Arc<dyn SearchIndex>>,
        policy: CachePolicy,
    ) -> Self {
        let completion = SuggestionSource::select(index, store.clone());
        debug!(source = completion.name(), "Autocomplete source selected");
        Self {
            store,
            cache,
            completion,
            policy,
        }
    }

    fn count_cache_event(name: &'static str, key: &CacheKey) {
        metrics::counter!(name, "path" => key.path().to_string()).increment(1);
    }

    /// Serves `key` from the cache, or runs `load` and stores its result.
    ///
    /// Cache trouble of any kind is logged and counted, then treated as a miss.
    async fn cached<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        load: F,
    ) -> Result<T, SearchError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, SearchError>> + Send,
    {
        match self.cache.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str::<T>(&payload) {
                Ok(value) => {
                    Self::count_cache_event("query_cache_hits_total", key);
                    debug!(event = "query_cache_hit", key = %key);
                    return Ok(value);
                }
                Err(e) => {
                    Self::count_cache_event("query_cache_errors_total", key);
                    warn!(
                        event = "query_cache_undecodable",
                        key = %key,
                        error = %e,
                        "Ignoring cached payload that does not decode"
                    );
                }
            },
            Ok(None) => {
                Self::count_cache_event("query_cache_misses_total", key);
                debug!(event = "query_cache_miss", key = %key);
            }
            Err(e) => {
                Self::count_cache_event("query_cache_errors_total", key);
                warn!(
                    event = "query_cache_get_failed",
                    key = %key,
                    backend = self.cache.backend_name(),
                    error = %e,
                    "Cache lookup failed; serving live"
                );
            }
        }

        let value = load().await?;

        match serde_json::to_string(&value) {
            Ok(payload) => {
                if let Err(e) = self.cache.set(key, payload, ttl).await {
                    Self::count_cache_event("query_cache_errors_total", key);
                    warn!(
                        event = "query_cache_set_failed",
                        key = %key,
                        backend = self.cache.backend_name(),
                        error = %e,
                        "Cache store failed"
                    );
                }
            }
            Err(e) => warn!(
                event = "query_cache_encode_failed",
                key = %key,
                error = %e,
                "Response not cacheable"
            ),
        }

        Ok(value)
    }
}

#[async_trait::async_trait]
impl SearchService for CachedSearchService {
    async fn search_farmers(
        &self,
        query: &FarmerSearchQuery,
    ) -> Result<FarmerSearchResponse, SearchError> {
        let key = CacheKey::farmers(query);
        self.cached(&key, self.policy.search_ttl, || async {
            let (farmers, total) = self.store.search_farmers(query).await?;
            Ok(FarmerSearchResponse {
                success: true,
                farmers,
                pagination: Pagination::new(query.page, total),
            })
        })
        .await
    }

    async fn search_grants(
        &self,
        query: &GrantSearchQuery,
    ) -> Result<GrantSearchResponse, SearchError> {
        let key = CacheKey::grants(query);
        self.cached(&key, self.policy.search_ttl, || async {
            let (grants, total) = self.store.search_grants(query).await?;
            Ok(GrantSearchResponse {
                success: true,
                grants,
                pagination: Pagination::new(query.page, total),
            })
        })
        .await
    }

    async fn autocomplete(
        &self,
        query: &AutocompleteQuery,
    ) -> Result<AutocompleteResponse, SearchError> {
        if query.is_too_short() {
            return Ok(AutocompleteResponse::empty());
        }

        let key = CacheKey::autocomplete(query);
        self.cached(&key, self.policy.suggestion_ttl, || async {
            let suggestions = self
                .completion
                .lookup(&query.prefix, query.scope, self.policy.completion_limit)
                .await?;
            Ok(AutocompleteResponse {
                success: true,
                suggestions,
            })
        })
        .await
    }

    async fn suggestions(
        &self,
        query: &SuggestionQuery,
    ) -> Result<SuggestionListResponse, SearchError> {
        let Some(kind) = query.kind else {
            return Ok(SuggestionListResponse::empty());
        };
        if query.is_too_short() {
            return Ok(SuggestionListResponse::empty());
        }

        let key = CacheKey::suggestions(query);
        self.cached(&key, self.policy.suggestion_ttl, || async {
            let source = SuggestionSource::StoreBacked(self.store.clone());
            let suggestions = source
                .lookup(&query.q, kind.field(), SUGGESTION_LIST_LIMIT)
                .await?
                .into_iter()
                .map(|s| s.text)
                .collect();
            Ok(SuggestionListResponse {
                success: true,
                suggestions,
            })
        })
        .await
    }
}

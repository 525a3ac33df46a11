use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{MemoryQueryCache, QueryCache, SqlQueryCache};
use crate::config::{CacheBackend, Config};
use crate::db::Store;
use crate::index::{SearchIndex, TantivyIndex};
use crate::services::{CachePolicy, CachedSearchService, IndexSynchronizer, SearchService};

/// Client handles built once at start-up and shared by every request.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub cache: Arc<dyn QueryCache>,

    /// `None` when the index is disabled or could not be opened.
    pub index: Option<Arc<dyn SearchIndex>>,

    pub search_service: Arc<dyn SearchService>,

    pub synchronizer: Option<Arc<IndexSynchronizer>>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let cache = build_cache(&config).await?;
        let index = open_index(&config);

        Ok(Self::from_parts(config, store, cache, index))
    }

    /// Wires the services around already constructed clients.
    #[must_use]
    pub fn from_parts(
        config: Config,
        store: Store,
        cache: Arc<dyn QueryCache>,
        index: Option<Arc<dyn SearchIndex>>,
    ) -> Self {
        let search_service: Arc<dyn SearchService> = Arc::new(CachedSearchService::new(
            store.clone(),
            Arc::clone(&cache),
            index.clone(),
            CachePolicy::from_config(&config),
        ));

        let synchronizer = index
            .as_ref()
            .map(|index| Arc::new(IndexSynchronizer::new(store.clone(), Arc::clone(index))));

        Self {
            config: Arc::new(config),
            store,
            cache,
            index,
            search_service,
            synchronizer,
        }
    }
}

async fn build_cache(config: &Config) -> anyhow::Result<Arc<dyn QueryCache>> {
    let cache: Arc<dyn QueryCache> = match config.cache.backend {
        CacheBackend::Memory => {
            Arc::new(MemoryQueryCache::with_capacity(config.cache.max_entries))
        }
        CacheBackend::Database => {
            Arc::new(SqlQueryCache::connect(&config.cache.database_url).await?)
        }
    };
    info!(backend = cache.backend_name(), "Query cache ready");
    Ok(cache)
}

fn open_index(config: &Config) -> Option<Arc<dyn SearchIndex>> {
    if !config.search_index.enabled {
        info!("Search index disabled; autocomplete will read from the primary store");
        return None;
    }

    match TantivyIndex::open(
        config.search_index.path.as_deref(),
        config.search_index.writer_memory_bytes,
    ) {
        Ok(index) => Some(Arc::new(index)),
        Err(e) => {
            warn!(
                event = "search_index_unavailable",
                error = %e,
                "Search index could not be opened; autocomplete will read from the primary store"
            );
            None
        }
    }
}

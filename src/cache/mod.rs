//! Response cache sitting in front of the store and the search index.

use std::time::Duration;

pub mod database;
pub mod key;
pub mod memory;

pub use database::SqlQueryCache;
pub use key::CacheKey;
pub use memory::MemoryQueryCache;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("Cache backend unreachable: {0}")]
    Unreachable(String),
}

impl From<sea_orm::DbErr> for CacheError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Backend(err.into())
    }
}

/// Key to serialized-response store with per-entry expiry.
///
/// Expired entries read as absent. Writers never coordinate; the last `set`
/// for a key wins.
#[async_trait::async_trait]
pub trait QueryCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    fn backend_name(&self) -> &'static str;
}

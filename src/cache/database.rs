use std::time::Duration;

use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::{info, warn};

use super::{CacheError, CacheKey, QueryCache};
use crate::db::migrator::CacheMigrator;
use crate::db::repositories::cache::CacheRepository;

/// Cache backend persisted in its own SQLite database.
///
/// The connection is lazy: a cache database that cannot be reached only
/// surfaces as per-request errors, which the query engine treats as misses.
#[derive(Clone)]
pub struct SqlQueryCache {
    conn: DatabaseConnection,
}

impl SqlQueryCache {
    pub async fn connect(database_url: &str) -> Result<Self, CacheError> {
        let conn = crate::db::connect(database_url, 5, 0, true).await?;

        match CacheMigrator::up(&conn, None).await {
            Ok(()) => info!(event = "cache_schema_ready", "Query cache table ready"),
            Err(e) => warn!(
                event = "cache_schema_failed",
                error = %e,
                "Query cache database not ready; lookups will miss until it is"
            ),
        }

        Ok(Self { conn })
    }

    fn repo(&self) -> CacheRepository {
        CacheRepository::new(self.conn.clone())
    }
}

#[async_trait::async_trait]
impl QueryCache for SqlQueryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        Ok(self.repo().get(key.as_str()).await?)
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<(), CacheError> {
        Ok(self.repo().set(key.as_str(), value, ttl).await?)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await
            .map_err(|e| CacheError::Unreachable(e.to_string()))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "database"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::search::FarmerSearchQuery;

    fn temp_cache_url() -> (String, std::path::PathBuf) {
        let path =
            std::env::temp_dir().join(format!("agrigrant-cache-{}.db", uuid::Uuid::new_v4()));
        (format!("sqlite:{}?mode=rwc", path.display()), path)
    }

    #[tokio::test]
    async fn round_trips_until_expiry() {
        let (url, path) = temp_cache_url();
        let cache = SqlQueryCache::connect(&url).await.unwrap();
        let key = CacheKey::farmers(&FarmerSearchQuery::default());

        assert_eq!(cache.get(&key).await.unwrap(), None);

        cache
            .set(&key, "first".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set(&key, "second".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("second"));

        cache
            .set(&key, "stale".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get(&key).await.unwrap(), None);

        cache.ping().await.unwrap();
        let _ = std::fs::remove_file(path);
    }
}

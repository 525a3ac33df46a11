use crate::entities::{prelude::*, query_cache};
use crate::models::{format_timestamp, now_timestamp};
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::time::Duration;

/// Row-level access to the `query_cache` table.
pub struct CacheRepository {
    conn: DatabaseConnection,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns the stored payload if it has not yet expired.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = now_timestamp();

        // Opportunistic cleanup; a failure here must not hide a live entry.
        let _ = QueryCache::delete_many()
            .filter(query_cache::Column::ExpiresAt.lte(&now))
            .exec(&self.conn)
            .await;

        let entry = QueryCache::find_by_id(key.to_string())
            .filter(query_cache::Column::ExpiresAt.gt(&now))
            .one(&self.conn)
            .await?;

        Ok(entry.map(|e| e.payload))
    }

    pub async fn set(&self, key: &str, payload: String, ttl: Duration) -> Result<()> {
        let now = chrono::Utc::now();
        let ttl = chrono::Duration::from_std(ttl)?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| anyhow::anyhow!("cache expiry overflows"))?;

        let active_model = query_cache::ActiveModel {
            cache_key: Set(key.to_string()),
            payload: Set(payload),
            created_at: Set(format_timestamp(now)),
            expires_at: Set(format_timestamp(expires_at)),
        };

        QueryCache::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(query_cache::Column::CacheKey)
                    .update_columns([
                        query_cache::Column::Payload,
                        query_cache::Column::CreatedAt,
                        query_cache::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }
}

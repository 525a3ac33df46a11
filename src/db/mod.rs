use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, QueryResult, Statement, Value,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::models::farmer::{FarmerRecord, NewFarmer};
use crate::models::grant::{GrantApplicationRecord, GrantSearchHit, NewGrantApplication};
use crate::models::search::{FarmerSearchQuery, GrantSearchQuery};

pub mod migrator;
pub mod repositories;

/// Accessor for the primary relational store.
///
/// Holds only a pooled connection; every method is a thin, parameterized query.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let conn = connect(db_url, max_connections, min_connections, false).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Runs an arbitrary parameterized statement and returns the raw rows.
    pub async fn query(&self, sql: &str, values: Vec<Value>) -> Result<Vec<QueryResult>> {
        let backend = self.conn.get_database_backend();
        let rows = self
            .conn
            .query_all(Statement::from_sql_and_values(backend, sql, values))
            .await?;
        Ok(rows)
    }

    fn farmer_repo(&self) -> repositories::farmer::FarmerRepository {
        repositories::farmer::FarmerRepository::new(self.conn.clone())
    }

    fn grant_repo(&self) -> repositories::grant::GrantRepository {
        repositories::grant::GrantRepository::new(self.conn.clone())
    }

    pub async fn add_farmer(&self, farmer: &NewFarmer) -> Result<FarmerRecord> {
        self.farmer_repo().add(farmer).await
    }

    pub async fn list_all_farmers(&self) -> Result<Vec<FarmerRecord>> {
        self.farmer_repo().list_all().await
    }

    pub async fn search_farmers(
        &self,
        query: &FarmerSearchQuery,
    ) -> Result<(Vec<FarmerRecord>, u64)> {
        self.farmer_repo().search(query).await
    }

    pub async fn distinct_farmer_names(&self, q: &str, limit: u64) -> Result<Vec<String>> {
        self.farmer_repo().distinct_names(q, limit).await
    }

    pub async fn distinct_farm_locations(&self, q: &str, limit: u64) -> Result<Vec<String>> {
        self.farmer_repo().distinct_locations(q, limit).await
    }

    pub async fn distinct_crop_types(&self, q: &str, limit: u64) -> Result<Vec<String>> {
        let rows = self
            .query(
                "SELECT DISTINCT crop.value AS value \
                 FROM farmers, json_each(farmers.crop_types) AS crop \
                 WHERE crop.value LIKE ? \
                 ORDER BY crop.value \
                 LIMIT ?",
                vec![
                    format!("%{q}%").into(),
                    i64::try_from(limit).unwrap_or(i64::MAX).into(),
                ],
            )
            .await?;

        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            values.push(row.try_get::<String>("", "value")?);
        }
        Ok(values)
    }

    pub async fn add_grant_application(
        &self,
        application: &NewGrantApplication,
    ) -> Result<GrantApplicationRecord> {
        self.grant_repo().add(application).await
    }

    pub async fn search_grants(
        &self,
        query: &GrantSearchQuery,
    ) -> Result<(Vec<GrantSearchHit>, u64)> {
        self.grant_repo().search(query).await
    }
}

/// Opens a pooled connection, creating the SQLite file first when needed.
///
/// `lazy` defers the first connection until a query needs it, so a missing
/// backing service shows up as per-query errors rather than a start-up failure.
pub(crate) async fn connect(
    db_url: &str,
    max_connections: u32,
    min_connections: u32,
    lazy: bool,
) -> Result<DatabaseConnection> {
    if db_url.starts_with("sqlite:") && !db_url.contains(":memory:") {
        let path_str = db_url
            .trim_start_matches("sqlite:")
            .trim_start_matches("//")
            .split('?')
            .next()
            .unwrap_or_default();
        if let Some(parent) = Path::new(path_str).parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        if !path_str.is_empty() && !Path::new(path_str).exists() {
            std::fs::File::create(path_str)?;
        }
    }

    let mut opt = ConnectOptions::new(db_url.to_string());
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(600))
        .connect_lazy(lazy)
        .sqlx_logging(false);

    Ok(Database::connect(opt).await?)
}

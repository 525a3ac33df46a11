use sea_orm_migration::prelude::*;

mod m20250301_initial;
mod m20250302_add_query_cache;

/// Schema for the primary store (farmers and grant applications).
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250301_initial::Migration)]
    }
}

/// Schema for the query cache database.
///
/// Tracked in its own migration table so the cache may share a database
/// with the primary store without the two histories colliding.
pub struct CacheMigrator;

#[async_trait::async_trait]
impl MigratorTrait for CacheMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250302_add_query_cache::Migration)]
    }

    fn migration_table_name() -> DynIden {
        Alias::new("seaql_cache_migrations").into_iden()
    }
}

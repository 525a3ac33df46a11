use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QueryCache::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QueryCache::CacheKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QueryCache::Payload).text().not_null())
                    .col(ColumnDef::new(QueryCache::CreatedAt).string().not_null())
                    .col(ColumnDef::new(QueryCache::ExpiresAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_query_cache_expires_at")
                    .table(QueryCache::Table)
                    .col(QueryCache::ExpiresAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QueryCache::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum QueryCache {
    Table,
    CacheKey,
    Payload,
    CreatedAt,
    ExpiresAt,
}

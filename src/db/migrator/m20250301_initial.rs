use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Farmers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Farmers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Farmers::Name).string().not_null())
                    .col(ColumnDef::new(Farmers::Email).string().not_null())
                    .col(ColumnDef::new(Farmers::Phone).string())
                    .col(ColumnDef::new(Farmers::FarmLocation).string().not_null())
                    .col(ColumnDef::new(Farmers::FarmSize).string())
                    .col(ColumnDef::new(Farmers::CropTypes).text())
                    .col(ColumnDef::new(Farmers::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_farmers_created_at")
                    .table(Farmers::Table)
                    .col(Farmers::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GrantApplications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GrantApplications::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GrantApplications::FarmerId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GrantApplications::GrantType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GrantApplications::AmountRequested)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GrantApplications::Purpose).text().not_null())
                    .col(ColumnDef::new(GrantApplications::Documents).text())
                    .col(
                        ColumnDef::new(GrantApplications::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(GrantApplications::CreatedAt)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grant_applications_farmer")
                            .from(GrantApplications::Table, GrantApplications::FarmerId)
                            .to(Farmers::Table, Farmers::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_grant_applications_farmer_id")
                    .table(GrantApplications::Table)
                    .col(GrantApplications::FarmerId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_grant_applications_created_at")
                    .table(GrantApplications::Table)
                    .col(GrantApplications::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GrantApplications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Farmers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Farmers {
    Table,
    Id,
    Name,
    Email,
    Phone,
    FarmLocation,
    FarmSize,
    CropTypes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GrantApplications {
    Table,
    Id,
    FarmerId,
    GrantType,
    AmountRequested,
    Purpose,
    Documents,
    Status,
    CreatedAt,
}

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "farmers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub farm_location: String,
    pub farm_size: Option<String>,
    /// JSON array of crop labels, e.g. `["leafy greens","herbs"]`.
    #[sea_orm(column_type = "Text", nullable)]
    pub crop_types: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::grant_applications::Entity")]
    GrantApplications,
}

impl Related<super::grant_applications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GrantApplications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

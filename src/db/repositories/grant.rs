use crate::entities::{farmers, grant_applications, prelude::*};
use crate::models::grant::{GrantApplicationRecord, GrantSearchHit, NewGrantApplication};
use crate::models::now_timestamp;
use crate::models::search::{GrantFilter, GrantSearchQuery};
use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};
use tracing::info;

use crate::models::grant::GrantStatus;

pub struct GrantRepository {
    conn: DatabaseConnection,
}

/// Flat row produced by the grant/farmer join.
#[derive(Debug, Clone, FromQueryResult)]
pub struct GrantSearchRow {
    pub id: i32,
    pub farmer_id: i32,
    pub grant_type: String,
    pub amount_requested: f64,
    pub purpose: String,
    pub documents: Option<String>,
    pub status: String,
    pub created_at: String,
    pub farmer_name: String,
    pub farmer_email: String,
}

impl From<GrantSearchRow> for GrantSearchHit {
    fn from(row: GrantSearchRow) -> Self {
        Self {
            application: GrantApplicationRecord::from(grant_applications::Model {
                id: row.id,
                farmer_id: row.farmer_id,
                grant_type: row.grant_type,
                amount_requested: row.amount_requested,
                purpose: row.purpose,
                documents: row.documents,
                status: row.status,
                created_at: row.created_at,
            }),
            farmer_name: row.farmer_name,
            farmer_email: row.farmer_email,
        }
    }
}

impl GrantRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub(crate) fn filter_condition(filter: &GrantFilter) -> Condition {
        Condition::all()
            .add_option(filter.q.as_deref().map(|q| {
                Condition::any()
                    .add(grant_applications::Column::Purpose.contains(q))
                    .add(farmers::Column::Name.contains(q))
            }))
            .add_option(
                filter
                    .grant_type
                    .as_deref()
                    .map(|grant_type| grant_applications::Column::GrantType.eq(grant_type)),
            )
            .add_option(
                filter
                    .status
                    .map(|status| grant_applications::Column::Status.eq(status.as_str())),
            )
    }

    fn filtered(filter: &GrantFilter) -> Select<GrantApplications> {
        GrantApplications::find()
            .join(
                JoinType::InnerJoin,
                grant_applications::Relation::Farmer.def(),
            )
            .column_as(farmers::Column::Name, "farmer_name")
            .column_as(farmers::Column::Email, "farmer_email")
            .filter(Self::filter_condition(filter))
            .order_by_desc(grant_applications::Column::CreatedAt)
            .order_by_desc(grant_applications::Column::Id)
    }

    pub async fn add(&self, application: &NewGrantApplication) -> Result<GrantApplicationRecord> {
        let active_model = grant_applications::ActiveModel {
            farmer_id: Set(application.farmer_id),
            grant_type: Set(application.grant_type.clone()),
            amount_requested: Set(application.amount_requested),
            purpose: Set(application.purpose.clone()),
            documents: Set(Some(serde_json::to_string(&application.documents)?)),
            status: Set(GrantStatus::Pending.as_str().to_string()),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        let model = active_model.insert(&self.conn).await?;
        info!(
            application_id = model.id,
            farmer_id = model.farmer_id,
            "Grant application stored"
        );
        Ok(model.into())
    }

    pub async fn search(&self, query: &GrantSearchQuery) -> Result<(Vec<GrantSearchHit>, u64)> {
        let paginator = Self::filtered(&query.filter)
            .into_model::<GrantSearchRow>()
            .paginate(&self.conn, query.page.limit);

        let total = paginator.num_items().await?;
        if query.page.offset().is_none() {
            return Ok((Vec::new(), total));
        }
        let rows = paginator.fetch_page(query.page.index()).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn grant_query_joins_owner_and_filters_exactly() {
        let sql = GrantRepository::filtered(&GrantFilter {
            q: Some("irrigation".to_string()),
            grant_type: Some("equipment".to_string()),
            status: Some(GrantStatus::UnderReview),
        })
        .build(DbBackend::Sqlite)
        .to_string();

        assert!(sql.contains("INNER JOIN \"farmers\""));
        assert!(sql.contains("\"farmer_name\""));
        assert!(sql.contains("\"grant_applications\".\"grant_type\" = 'equipment'"));
        assert!(sql.contains("\"grant_applications\".\"status\" = 'under_review'"));
        assert!(sql.contains("\"farmers\".\"name\" LIKE '%irrigation%'"));
    }
}

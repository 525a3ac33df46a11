use crate::entities::{farmers, prelude::*};
use crate::models::farmer::{FarmerRecord, NewFarmer};
use crate::models::now_timestamp;
use crate::models::search::{FarmerFilter, FarmerSearchQuery};
use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use tracing::info;

pub struct FarmerRepository {
    conn: DatabaseConnection,
}

impl FarmerRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// The one place farmer search predicates are built.
    ///
    /// Both the count and the page query are derived from the `Select` this
    /// feeds, so the two can never disagree on which rows match.
    pub(crate) fn filter_condition(filter: &FarmerFilter) -> Condition {
        Condition::all()
            .add_option(filter.q.as_deref().map(|q| {
                Condition::any()
                    .add(farmers::Column::Name.contains(q))
                    .add(farmers::Column::Email.contains(q))
            }))
            .add_option(
                filter
                    .location
                    .as_deref()
                    .map(|location| farmers::Column::FarmLocation.contains(location)),
            )
            .add_option(
                filter
                    .crop_type
                    .as_deref()
                    .map(|crop| farmers::Column::CropTypes.contains(crop)),
            )
            .add_option(
                filter
                    .farm_size
                    .as_deref()
                    .map(|size| farmers::Column::FarmSize.eq(size)),
            )
    }

    fn filtered(filter: &FarmerFilter) -> Select<Farmers> {
        Farmers::find()
            .filter(Self::filter_condition(filter))
            .order_by_desc(farmers::Column::CreatedAt)
            .order_by_desc(farmers::Column::Id)
    }

    pub async fn add(&self, farmer: &NewFarmer) -> Result<FarmerRecord> {
        let active_model = farmers::ActiveModel {
            name: Set(farmer.name.clone()),
            email: Set(farmer.email.clone()),
            phone: Set(farmer.phone.clone()),
            farm_location: Set(farmer.farm_location.clone()),
            farm_size: Set(farmer.farm_size.clone()),
            crop_types: Set(farmer
                .crop_types
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        let model = active_model.insert(&self.conn).await?;
        info!(farmer_id = model.id, "Farmer stored");
        Ok(model.into())
    }

    pub async fn list_all(&self) -> Result<Vec<FarmerRecord>> {
        let rows = Farmers::find()
            .order_by_asc(farmers::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Returns one page of matches (newest first) and the total match count.
    pub async fn search(&self, query: &FarmerSearchQuery) -> Result<(Vec<FarmerRecord>, u64)> {
        let paginator = Self::filtered(&query.filter).paginate(&self.conn, query.page.limit);

        let total = paginator.num_items().await?;
        if query.page.offset().is_none() {
            return Ok((Vec::new(), total));
        }
        let rows = paginator.fetch_page(query.page.index()).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    pub async fn distinct_names(&self, q: &str, limit: u64) -> Result<Vec<String>> {
        let names = Farmers::find()
            .select_only()
            .column(farmers::Column::Name)
            .distinct()
            .filter(farmers::Column::Name.contains(q))
            .order_by_asc(farmers::Column::Name)
            .limit(limit)
            .into_tuple::<String>()
            .all(&self.conn)
            .await?;
        Ok(names)
    }

    pub async fn distinct_locations(&self, q: &str, limit: u64) -> Result<Vec<String>> {
        let locations = Farmers::find()
            .select_only()
            .column(farmers::Column::FarmLocation)
            .distinct()
            .filter(farmers::Column::FarmLocation.contains(q))
            .order_by_asc(farmers::Column::FarmLocation)
            .limit(limit)
            .into_tuple::<String>()
            .all(&self.conn)
            .await?;
        Ok(locations)
    }
}

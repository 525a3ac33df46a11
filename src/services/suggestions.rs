use std::sync::Arc;

use crate::db::Store;
use crate::index::SearchIndex;
use crate::models::search::{SuggestField, Suggestion};

use super::search_service::SearchError;

/// Score given to every store-backed option; the store has no ranking.
pub const STORE_SUGGESTION_SCORE: f32 = 1.0;

/// Where completion options come from.
#[derive(Clone)]
pub enum SuggestionSource {
    /// Ranked completion from the search index.
    IndexBacked(Arc<dyn SearchIndex>),
    /// Distinct substring matches straight from the primary store.
    StoreBacked(Store),
}

impl SuggestionSource {
    /// Prefers the index when one is configured and reports itself available.
    #[must_use]
    pub fn select(index: Option<Arc<dyn SearchIndex>>, store: Store) -> Self {
        match index {
            Some(index) if index.is_available() => Self::IndexBacked(index),
            _ => Self::StoreBacked(store),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IndexBacked(_) => "index",
            Self::StoreBacked(_) => "store",
        }
    }

    pub async fn lookup(
        &self,
        text: &str,
        scope: SuggestField,
        limit: u64,
    ) -> Result<Vec<Suggestion>, SearchError> {
        match self {
            Self::IndexBacked(index) => {
                let limit = usize::try_from(limit).unwrap_or(usize::MAX);
                Ok(index.search_completion(text, scope, limit).await?)
            }
            Self::StoreBacked(store) => {
                let values = Self::distinct_values(store, text, scope, limit).await?;
                Ok(values
                    .into_iter()
                    .map(|text| Suggestion {
                        text,
                        score: STORE_SUGGESTION_SCORE,
                    })
                    .collect())
            }
        }
    }

    async fn distinct_values(
        store: &Store,
        text: &str,
        scope: SuggestField,
        limit: u64,
    ) -> Result<Vec<String>, SearchError> {
        let values = match scope {
            SuggestField::Name => store.distinct_farmer_names(text, limit).await?,
            SuggestField::Location => store.distinct_farm_locations(text, limit).await?,
            SuggestField::Crop => store.distinct_crop_types(text, limit).await?,
            SuggestField::All => {
                let mut values = store.distinct_farmer_names(text, limit).await?;
                values.extend(store.distinct_farm_locations(text, limit).await?);
                values.extend(store.distinct_crop_types(text, limit).await?);

                let mut seen = std::collections::HashSet::new();
                values.retain(|v| seen.insert(v.to_lowercase()));
                values.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
                values
            }
        };
        Ok(values)
    }
}

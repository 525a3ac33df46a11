//! Secondary search index holding one denormalized document per farmer.
//!
//! The synchronizer is the only writer. The query engine reads completion
//! suggestions from it; listings are served from the primary store.

use serde::{Deserialize, Serialize};

use crate::models::farmer::FarmerRecord;
use crate::models::search::{SuggestField, Suggestion};

pub mod tantivy_index;

pub use tantivy_index::TantivyIndex;

/// Weight every suggestion input is indexed with.
pub const UNIFORM_SUGGEST_WEIGHT: u64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Search index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("Search index directory error: {0}")]
    Directory(String),

    #[error("Search index task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Search index is unavailable")]
    Unavailable,
}

/// Completion payload attached to a search document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestInput {
    pub input: Vec<String>,
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub farm_location: String,
    pub farm_size: Option<String>,
    pub crop_types: Vec<String>,
    pub created_at: String,
    pub suggest: SuggestInput,
}

impl SearchDocument {
    fn non_blank(value: &str) -> Option<String> {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Name entry of the suggestion inputs, if present.
    #[must_use]
    pub fn name_inputs(&self) -> Vec<String> {
        Self::non_blank(&self.name).into_iter().collect()
    }

    #[must_use]
    pub fn location_inputs(&self) -> Vec<String> {
        Self::non_blank(&self.farm_location).into_iter().collect()
    }

    #[must_use]
    pub fn crop_inputs(&self) -> Vec<String> {
        self.crop_types
            .iter()
            .filter_map(|crop| Self::non_blank(crop))
            .collect()
    }
}

impl From<&FarmerRecord> for SearchDocument {
    fn from(farmer: &FarmerRecord) -> Self {
        let mut document = Self {
            id: farmer.id,
            name: farmer.name.clone(),
            email: farmer.email.clone(),
            phone: farmer.phone.clone(),
            farm_location: farmer.farm_location.clone(),
            farm_size: farmer.farm_size.clone(),
            crop_types: farmer.crop_types.clone().unwrap_or_default(),
            created_at: farmer.created_at.clone(),
            suggest: SuggestInput {
                input: Vec::new(),
                weight: UNIFORM_SUGGEST_WEIGHT,
            },
        };

        let mut input = document.name_inputs();
        input.extend(document.location_inputs());
        input.extend(document.crop_inputs());
        document.suggest.input = input;
        document
    }
}

/// A document the index refused during a bulk write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemFailure {
    pub id: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub indexed: usize,
    pub failures: Vec<BulkItemFailure>,
}

impl BulkResponse {
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[async_trait::async_trait]
pub trait SearchIndex: Send + Sync {
    /// Inserts or replaces documents keyed by id and commits once.
    ///
    /// Documents the index cannot accept are reported per item; the rest are
    /// still committed. An error return means nothing was committed.
    async fn bulk_upsert(&self, documents: Vec<SearchDocument>) -> Result<BulkResponse, IndexError>;

    /// Ranked completion options for a lower-cased prefix.
    async fn search_completion(
        &self,
        prefix: &str,
        scope: SuggestField,
        limit: usize,
    ) -> Result<Vec<Suggestion>, IndexError>;

    /// Every indexed document, ordered by id.
    async fn all_documents(&self) -> Result<Vec<SearchDocument>, IndexError>;

    async fn ping(&self) -> Result<(), IndexError>;

    /// Whether completion reads should be routed here.
    fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farmer(crop_types: Option<Vec<&str>>) -> FarmerRecord {
        FarmerRecord {
            id: 7,
            name: "Lim Ah Seng".to_string(),
            email: "ahseng@example.com".to_string(),
            phone: None,
            farm_location: "Lim Chu Kang".to_string(),
            farm_size: Some("small".to_string()),
            crop_types: crop_types.map(|crops| crops.into_iter().map(String::from).collect()),
            created_at: "2025-03-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn suggest_inputs_follow_name_location_crops_order() {
        let document = SearchDocument::from(&farmer(Some(vec!["leafy greens", "  ", "herbs"])));

        assert_eq!(
            document.suggest.input,
            vec!["Lim Ah Seng", "Lim Chu Kang", "leafy greens", "herbs"]
        );
        assert_eq!(document.suggest.weight, UNIFORM_SUGGEST_WEIGHT);
    }

    #[test]
    fn missing_crops_yield_name_and_location_only() {
        let document = SearchDocument::from(&farmer(None));

        assert!(document.crop_types.is_empty());
        assert_eq!(document.suggest.input.len(), 2);
    }
}

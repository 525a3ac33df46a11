//! Domain service for farmer and grant search.
//!
//! Every operation takes an already validated, typed query and returns the
//! response body the HTTP layer serializes.

use crate::api::types::{
    AutocompleteResponse, FarmerSearchResponse, GrantSearchResponse, SuggestionListResponse,
};
use crate::index::IndexError;
use crate::models::search::{
    AutocompleteQuery, FarmerSearchQuery, GrantSearchQuery, SuggestionQuery,
};
use thiserror::Error;

/// Errors specific to search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Primary store error: {0}")]
    Store(String),

    #[error("Search index error: {0}")]
    Index(String),
}

impl From<sea_orm::DbErr> for SearchError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<anyhow::Error> for SearchError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<IndexError> for SearchError {
    fn from(err: IndexError) -> Self {
        Self::Index(err.to_string())
    }
}

/// Domain service trait for search reads.
#[async_trait::async_trait]
pub trait SearchService: Send + Sync {
    /// Paginated farmer listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] when the count or page query fails.
    async fn search_farmers(
        &self,
        query: &FarmerSearchQuery,
    ) -> Result<FarmerSearchResponse, SearchError>;

    /// Paginated grant applications joined with their owning farmer.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] when the count or page query fails.
    async fn search_grants(
        &self,
        query: &GrantSearchQuery,
    ) -> Result<GrantSearchResponse, SearchError>;

    /// Ranked completion options for a prefix.
    ///
    /// Prefixes shorter than the minimum yield an empty list without any
    /// cache or backend access.
    async fn autocomplete(
        &self,
        query: &AutocompleteQuery,
    ) -> Result<AutocompleteResponse, SearchError>;

    /// Distinct stored values containing `q`, for the legacy suggestion box.
    async fn suggestions(
        &self,
        query: &SuggestionQuery,
    ) -> Result<SuggestionListResponse, SearchError>;
}

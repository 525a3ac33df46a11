use serde::{Deserialize, Serialize};

use crate::models::farmer::FarmerRecord;
use crate::models::grant::GrantSearchHit;
use crate::models::search::{PageRequest, Suggestion};
use crate::services::SyncReport;

/// Body of every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    #[must_use]
    pub const fn new(page: PageRequest, total: u64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            pages: page.total_pages(total),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmerSearchResponse {
    pub success: bool,
    pub farmers: Vec<FarmerRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantSearchResponse {
    pub success: bool,
    pub grants: Vec<GrantSearchHit>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    pub success: bool,
    pub suggestions: Vec<Suggestion>,
}

impl AutocompleteResponse {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            success: true,
            suggestions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionListResponse {
    pub success: bool,
    pub suggestions: Vec<String>,
}

impl SuggestionListResponse {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            success: true,
            suggestions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncResponse {
    pub success: bool,
    pub report: SyncReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: HealthCheck,
    pub cache: HealthCheck,
    pub search_index: HealthCheck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub checks: HealthChecks,
}

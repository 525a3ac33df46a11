use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entities::grant_applications;

/// Review state of a grant application. Transitions are owned elsewhere;
/// this service only filters on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Pending,
    #[serde(alias = "under-review")]
    UnderReview,
    Approved,
    Rejected,
}

impl GrantStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "under_review" | "under-review" => Ok(Self::UnderReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!(
                "Unknown grant status '{other}'. Expected one of: pending, under_review, approved, rejected"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantApplicationRecord {
    pub id: i32,
    pub farmer_id: i32,
    pub grant_type: String,
    pub amount_requested: f64,
    pub purpose: String,
    pub documents: Vec<String>,
    pub status: String,
    pub created_at: String,
}

impl From<grant_applications::Model> for GrantApplicationRecord {
    fn from(model: grant_applications::Model) -> Self {
        Self {
            id: model.id,
            farmer_id: model.farmer_id,
            grant_type: model.grant_type,
            amount_requested: model.amount_requested,
            purpose: model.purpose,
            documents: model
                .documents
                .and_then(|raw| serde_json::from_str(&raw).ok())
                .unwrap_or_default(),
            status: model.status,
            created_at: model.created_at,
        }
    }
}

/// A grant application joined with its owner's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantSearchHit {
    #[serde(flatten)]
    pub application: GrantApplicationRecord,
    pub farmer_name: String,
    pub farmer_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGrantApplication {
    pub farmer_id: i32,
    pub grant_type: String,
    pub amount_requested: f64,
    pub purpose: String,
    #[serde(default)]
    pub documents: Vec<String>,
}

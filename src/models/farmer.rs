use serde::{Deserialize, Serialize};

use crate::entities::farmers;

/// A farmer as held by the primary store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmerRecord {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub farm_location: String,
    pub farm_size: Option<String>,
    pub crop_types: Option<Vec<String>>,
    pub created_at: String,
}

impl From<farmers::Model> for FarmerRecord {
    fn from(model: farmers::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            farm_location: model.farm_location,
            farm_size: model.farm_size,
            crop_types: model
                .crop_types
                .and_then(|raw| serde_json::from_str(&raw).ok()),
            created_at: model.created_at,
        }
    }
}

/// Input for inserting a farmer. Registration itself lives in another service;
/// this is the write half of the store accessor it calls into.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFarmer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub farm_location: String,
    pub farm_size: Option<String>,
    pub crop_types: Option<Vec<String>>,
}

use axum::{Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{
    SearchParams, validate_autocomplete, validate_farmer_search, validate_grant_search,
    validate_suggestions,
};
use super::{
    ApiError, AppState, AutocompleteResponse, FarmerSearchResponse, GrantSearchResponse,
    SuggestionListResponse,
};

// Raw query strings. Everything is optional text so that malformed numbers
// surface as validation messages rather than deserializer errors.

#[derive(Debug, Default, Deserialize)]
pub struct FarmerSearchParams {
    pub q: Option<String>,
    pub location: Option<String>,
    pub crop_type: Option<String>,
    pub farm_size: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GrantSearchParams {
    pub q: Option<String>,
    pub grant_type: Option<String>,
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteParams {
    pub q: Option<String>,
    pub r#type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionParams {
    pub r#type: Option<String>,
    pub q: Option<String>,
}

pub async fn search_farmers(
    State(state): State<Arc<AppState>>,
    SearchParams(params): SearchParams<FarmerSearchParams>,
) -> Result<Json<FarmerSearchResponse>, ApiError> {
    let query = validate_farmer_search(&params)?;
    let response = state.search_service().search_farmers(&query).await?;
    Ok(Json(response))
}

pub async fn search_grants(
    State(state): State<Arc<AppState>>,
    SearchParams(params): SearchParams<GrantSearchParams>,
) -> Result<Json<GrantSearchResponse>, ApiError> {
    let query = validate_grant_search(&params)?;
    let response = state.search_service().search_grants(&query).await?;
    Ok(Json(response))
}

pub async fn autocomplete(
    State(state): State<Arc<AppState>>,
    SearchParams(params): SearchParams<AutocompleteParams>,
) -> Result<Json<AutocompleteResponse>, ApiError> {
    let query = validate_autocomplete(&params)?;
    let response = state.search_service().autocomplete(&query).await?;
    Ok(Json(response))
}

pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    SearchParams(params): SearchParams<SuggestionParams>,
) -> Result<Json<SuggestionListResponse>, ApiError> {
    let query = validate_suggestions(&params)?;
    let response = state.search_service().suggestions(&query).await?;
    Ok(Json(response))
}

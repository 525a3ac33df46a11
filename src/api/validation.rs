//! Turns raw query-string values into typed, normalized search queries.
//!
//! Runs before any cache or store access; every rejection is a 400.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use super::ApiError;
use super::search::{AutocompleteParams, FarmerSearchParams, GrantSearchParams, SuggestionParams};
use crate::models::grant::GrantStatus;
use crate::models::search::{
    AutocompleteQuery, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, FarmerFilter, FarmerSearchQuery,
    GrantFilter, GrantSearchQuery, MAX_PAGE_SIZE, PageRequest, SuggestField, SuggestionKind,
    SuggestionQuery,
};

/// Query-string extractor whose rejections (duplicate keys, undecodable
/// input) come back as validation errors instead of plain-text 400s.
pub struct SearchParams<T>(pub T);

impl<T, S> FromRequestParts<S> for SearchParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Query::try_from_uri(&parts.uri)
            .map(|Query(params)| Self(params))
            .map_err(|rejection| ApiError::validation(rejection.body_text()))
    }
}

/// Trimmed value, or `None` when absent or blank.
pub fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_positive(name: &str, value: Option<&str>, default: u64) -> Result<u64, ApiError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };

    match raw.parse::<u64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ApiError::validation(format!(
            "Invalid {name}: {raw}. {name} must be a positive integer"
        ))),
    }
}

/// Page defaults to 1, limit to 20; limits above the maximum are capped.
pub fn validate_page(page: Option<&str>, limit: Option<&str>) -> Result<PageRequest, ApiError> {
    let page = parse_positive("page", page, DEFAULT_PAGE)?;
    let limit = parse_positive("limit", limit, DEFAULT_PAGE_SIZE)?.min(MAX_PAGE_SIZE);
    let request = PageRequest { page, limit };
    if request.offset().is_none() {
        return Err(ApiError::validation(format!(
            "Invalid page: {page}. page is out of range for limit {limit}"
        )));
    }
    Ok(request)
}

pub fn validate_farmer_search(params: &FarmerSearchParams) -> Result<FarmerSearchQuery, ApiError> {
    Ok(FarmerSearchQuery {
        filter: FarmerFilter {
            q: normalize_text(params.q.as_deref()),
            location: normalize_text(params.location.as_deref()),
            crop_type: normalize_text(params.crop_type.as_deref()),
            farm_size: normalize_text(params.farm_size.as_deref()),
        },
        page: validate_page(params.page.as_deref(), params.limit.as_deref())?,
    })
}

pub fn validate_grant_search(params: &GrantSearchParams) -> Result<GrantSearchQuery, ApiError> {
    let status = normalize_text(params.status.as_deref())
        .map(|s| s.parse::<GrantStatus>())
        .transpose()
        .map_err(ApiError::validation)?;

    Ok(GrantSearchQuery {
        filter: GrantFilter {
            q: normalize_text(params.q.as_deref()),
            grant_type: normalize_text(params.grant_type.as_deref()),
            status,
        },
        page: validate_page(params.page.as_deref(), params.limit.as_deref())?,
    })
}

pub fn validate_autocomplete(params: &AutocompleteParams) -> Result<AutocompleteQuery, ApiError> {
    let scope = params
        .r#type
        .as_deref()
        .map_or(Ok(SuggestField::All), str::parse::<SuggestField>)
        .map_err(ApiError::validation)?;

    Ok(AutocompleteQuery {
        prefix: normalize_text(params.q.as_deref())
            .unwrap_or_default()
            .to_lowercase(),
        scope,
    })
}

pub fn validate_suggestions(params: &SuggestionParams) -> Result<SuggestionQuery, ApiError> {
    let kind = normalize_text(params.r#type.as_deref())
        .map(|t| t.parse::<SuggestionKind>())
        .transpose()
        .map_err(ApiError::validation)?;

    Ok(SuggestionQuery {
        kind,
        q: normalize_text(params.q.as_deref()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_cap() {
        assert_eq!(
            validate_page(None, Some(" ")).unwrap(),
            PageRequest { page: 1, limit: 20 }
        );
        assert_eq!(validate_page(Some("3"), Some("500")).unwrap().limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn page_rejects_zero_and_garbage() {
        assert!(validate_page(Some("0"), None).is_err());
        assert!(validate_page(None, Some("-5")).is_err());
        assert!(validate_page(Some("two"), None).is_err());
    }

    #[test]
    fn page_offset_must_fit_the_store() {
        assert!(validate_page(Some("1000000000000000000"), Some("100")).is_err());
        assert!(validate_page(Some(&u64::MAX.to_string()), Some("1")).is_err());

        let last = i64::MAX.unsigned_abs() + 1;
        assert!(validate_page(Some(&last.to_string()), Some("1")).is_ok());
    }

    #[test]
    fn grant_status_is_checked_against_known_states() {
        let params = GrantSearchParams {
            status: Some("under-review".to_string()),
            ..Default::default()
        };
        let query = validate_grant_search(&params).unwrap();
        assert_eq!(query.filter.status, Some(GrantStatus::UnderReview));

        let params = GrantSearchParams {
            status: Some("lost".to_string()),
            ..Default::default()
        };
        assert!(validate_grant_search(&params).is_err());
    }

    #[test]
    fn autocomplete_prefix_is_trimmed_and_lowered() {
        let query = validate_autocomplete(&AutocompleteParams {
            q: Some("  LiM ".to_string()),
            r#type: None,
        })
        .unwrap();
        assert_eq!(query.prefix, "lim");
        assert_eq!(query.scope, SuggestField::All);

        assert!(
            validate_autocomplete(&AutocompleteParams {
                q: Some("li".to_string()),
                r#type: Some("email".to_string()),
            })
            .is_err()
        );
    }

    #[test]
    fn suggestions_without_type_have_no_kind() {
        let query = validate_suggestions(&SuggestionParams {
            r#type: None,
            q: Some("ka".to_string()),
        })
        .unwrap();
        assert_eq!(query.kind, None);

        assert!(
            validate_suggestions(&SuggestionParams {
                r#type: Some("size".to_string()),
                q: Some("ka".to_string()),
            })
            .is_err()
        );
    }
}

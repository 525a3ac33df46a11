use std::collections::BTreeMap;
use std::fmt;

use crate::models::search::{
    AutocompleteQuery, FarmerSearchQuery, GrantSearchQuery, SuggestionQuery,
};

/// Canonical cache signature of a normalized request.
///
/// Rendered as `<path>:` followed by `name=value` pairs sorted by name and
/// joined with `&`. Values are percent-encoded, blank values are left out,
/// and `page`/`limit` are always present on listing paths. Only the typed
/// query feeds the key, so parameters the handlers ignore cannot split it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

struct KeyBuilder {
    path: &'static str,
    params: BTreeMap<&'static str, String>,
}

impl KeyBuilder {
    const fn new(path: &'static str) -> Self {
        Self {
            path,
            params: BTreeMap::new(),
        }
    }

    fn param(mut self, name: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.params.insert(name, urlencoding::encode(value).into_owned());
        }
        self
    }

    fn number(mut self, name: &'static str, value: u64) -> Self {
        self.params.insert(name, value.to_string());
        self
    }

    fn build(self) -> CacheKey {
        let pairs: Vec<String> = self
            .params
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        CacheKey(format!("{}:{}", self.path, pairs.join("&")))
    }
}

impl CacheKey {
    #[must_use]
    pub fn farmers(query: &FarmerSearchQuery) -> Self {
        let filter = &query.filter;
        KeyBuilder::new("farmers")
            .param("q", filter.q.as_deref())
            .param("location", filter.location.as_deref())
            .param("crop_type", filter.crop_type.as_deref())
            .param("farm_size", filter.farm_size.as_deref())
            .number("page", query.page.page)
            .number("limit", query.page.limit)
            .build()
    }

    #[must_use]
    pub fn grants(query: &GrantSearchQuery) -> Self {
        let filter = &query.filter;
        KeyBuilder::new("grants")
            .param("q", filter.q.as_deref())
            .param("grant_type", filter.grant_type.as_deref())
            .param("status", filter.status.map(|s| s.as_str()))
            .number("page", query.page.page)
            .number("limit", query.page.limit)
            .build()
    }

    #[must_use]
    pub fn autocomplete(query: &AutocompleteQuery) -> Self {
        KeyBuilder::new("autocomplete")
            .param("q", Some(query.prefix.to_lowercase().as_str()))
            .param("type", Some(query.scope.as_str()))
            .build()
    }

    #[must_use]
    pub fn suggestions(query: &SuggestionQuery) -> Self {
        KeyBuilder::new("suggestions")
            .param("q", Some(query.q.as_str()))
            .param("type", query.kind.map(|k| k.as_str()))
            .build()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading path segment, used as a metrics label.
    #[must_use]
    pub fn path(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(path, _)| path)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grant::GrantStatus;
    use crate::models::search::{
        FarmerFilter, GrantFilter, PageRequest, SuggestField, SuggestionKind,
    };

    #[test]
    fn farmer_key_is_sorted_and_encoded() {
        let key = CacheKey::farmers(&FarmerSearchQuery {
            filter: FarmerFilter {
                q: Some("tan".to_string()),
                location: Some("Lim Chu Kang".to_string()),
                crop_type: None,
                farm_size: Some("  ".to_string()),
            },
            page: PageRequest { page: 2, limit: 5 },
        });

        assert_eq!(
            key.as_str(),
            "farmers:limit=5&location=Lim%20Chu%20Kang&page=2&q=tan"
        );
        assert_eq!(key.path(), "farmers");
    }

    #[test]
    fn default_page_is_always_in_the_key() {
        let key = CacheKey::farmers(&FarmerSearchQuery::default());
        assert_eq!(key.as_str(), "farmers:limit=20&page=1");
    }

    #[test]
    fn encoding_prevents_delimiter_collisions() {
        let tricky = CacheKey::grants(&GrantSearchQuery {
            filter: GrantFilter {
                q: Some("a&status=approved".to_string()),
                grant_type: None,
                status: None,
            },
            page: PageRequest::default(),
        });
        let honest = CacheKey::grants(&GrantSearchQuery {
            filter: GrantFilter {
                q: Some("a".to_string()),
                grant_type: None,
                status: Some(GrantStatus::Approved),
            },
            page: PageRequest::default(),
        });

        assert_ne!(tricky, honest);
    }

    #[test]
    fn autocomplete_key_is_case_insensitive() {
        let upper = CacheKey::autocomplete(&AutocompleteQuery {
            prefix: "LIM".to_string(),
            scope: SuggestField::All,
        });
        let lower = CacheKey::autocomplete(&AutocompleteQuery {
            prefix: "lim".to_string(),
            scope: SuggestField::All,
        });

        assert_eq!(upper, lower);
        assert_eq!(lower.as_str(), "autocomplete:q=lim&type=all");
    }

    #[test]
    fn suggestion_key_includes_kind() {
        let key = CacheKey::suggestions(&SuggestionQuery {
            kind: Some(SuggestionKind::Crop),
            q: "ka".to_string(),
        });
        assert_eq!(key.as_str(), "suggestions:q=ka&type=crop");
    }
}

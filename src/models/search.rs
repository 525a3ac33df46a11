//! Typed search requests shared by the store, the query engine and the cache key.
//!
//! Everything in here is already validated and normalized: blank strings are
//! `None`, pages are 1-based and bounded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::grant::GrantStatus;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Prefixes shorter than this (in characters) never reach a backend.
pub const MIN_PREFIX_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Zero-based page index as the paginator expects it.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.page.saturating_sub(1)
    }

    /// Rows skipped before this page, or `None` when the offset does not fit
    /// a signed 64-bit SQL offset.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.index()
            .checked_mul(self.limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
    }

    #[must_use]
    pub const fn total_pages(&self, total: u64) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        total.div_ceil(self.limit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FarmerFilter {
    /// Substring over name or email.
    pub q: Option<String>,
    pub location: Option<String>,
    pub crop_type: Option<String>,
    /// Exact match.
    pub farm_size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FarmerSearchQuery {
    pub filter: FarmerFilter,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantFilter {
    /// Substring over purpose or the owning farmer's name.
    pub q: Option<String>,
    pub grant_type: Option<String>,
    pub status: Option<GrantStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantSearchQuery {
    pub filter: GrantFilter,
    pub page: PageRequest,
}

/// Which part of a farmer document an autocomplete request is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestField {
    #[default]
    All,
    Name,
    Location,
    Crop,
}

impl SuggestField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Name => "name",
            Self::Location => "location",
            Self::Crop => "crop",
        }
    }

    /// A concrete field scope turns on fuzzy completion.
    #[must_use]
    pub const fn is_scoped(self) -> bool {
        !matches!(self, Self::All)
    }
}

impl fmt::Display for SuggestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuggestField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "name" => Ok(Self::Name),
            "location" => Ok(Self::Location),
            "crop" | "crop_type" => Ok(Self::Crop),
            other => Err(format!(
                "Unknown suggestion type '{other}'. Expected one of: all, name, location, crop"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteQuery {
    /// Trimmed, lower-cased prefix.
    pub prefix: String,
    pub scope: SuggestField,
}

impl AutocompleteQuery {
    #[must_use]
    pub fn is_too_short(&self) -> bool {
        self.prefix.chars().count() < MIN_PREFIX_LEN
    }
}

/// Value family served by the distinct-value suggestion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    Location,
    Crop,
}

impl SuggestionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Crop => "crop",
        }
    }

    #[must_use]
    pub const fn field(self) -> SuggestField {
        match self {
            Self::Location => SuggestField::Location,
            Self::Crop => SuggestField::Crop,
        }
    }
}

impl FromStr for SuggestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "location" => Ok(Self::Location),
            "crop" | "crop_type" => Ok(Self::Crop),
            other => Err(format!(
                "Unknown suggestion type '{other}'. Expected one of: location, crop"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionQuery {
    /// `None` when the caller sent no type; such requests yield nothing.
    pub kind: Option<SuggestionKind>,
    pub q: String,
}

impl SuggestionQuery {
    #[must_use]
    pub fn is_too_short(&self) -> bool {
        self.q.chars().count() < MIN_PREFIX_LEN
    }
}

/// One ranked completion option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let page = PageRequest { page: 1, limit: 20 };
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(1), 1);
        assert_eq!(page.total_pages(20), 1);
        assert_eq!(page.total_pages(21), 2);
    }

    #[test]
    fn page_index_is_zero_based() {
        assert_eq!(PageRequest { page: 1, limit: 5 }.index(), 0);
        assert_eq!(PageRequest { page: 4, limit: 5 }.index(), 3);
    }

    #[test]
    fn suggest_field_parsing() {
        assert_eq!("ALL".parse::<SuggestField>(), Ok(SuggestField::All));
        assert_eq!("".parse::<SuggestField>(), Ok(SuggestField::All));
        assert_eq!("crop_type".parse::<SuggestField>(), Ok(SuggestField::Crop));
        assert!("email".parse::<SuggestField>().is_err());
        assert!(!SuggestField::All.is_scoped());
        assert!(SuggestField::Name.is_scoped());
    }

    #[test]
    fn prefix_length_counts_characters() {
        let query = AutocompleteQuery {
            prefix: "é".to_string(),
            scope: SuggestField::All,
        };
        assert!(query.is_too_short());

        let query = AutocompleteQuery {
            prefix: "li".to_string(),
            scope: SuggestField::All,
        };
        assert!(!query.is_too_short());
    }
}

//! Case-insensitive substring search shared by listing, resolution and ranking.

use crate::entities::catalog_item;

/// A normalized (trimmed, lowercased) search term. The empty term matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Normalizes raw user input.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    /// Whether the term filters nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The normalized text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `field` contains the term.
    #[must_use]
    pub fn matches(&self, field: &str) -> bool {
        self.is_empty() || field.to_lowercase().contains(&self.0)
    }

    /// Whether any of `fields` contains the term.
    pub fn matches_any<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        self.is_empty() || fields.into_iter().any(|field| self.matches(field))
    }

    /// Matches a catalog item on its code, every localized name and its region.
    #[must_use]
    pub fn matches_catalog_item(&self, item: &catalog_item::Model) -> bool {
        self.matches_any([
            item.code.as_str(),
            item.name_fr.as_str(),
            item.name_en.as_str(),
            item.name_ar.as_str(),
            item.region.as_deref().unwrap_or_default(),
        ])
    }
}

impl From<&str> for SearchTerm {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

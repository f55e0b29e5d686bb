use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category identifier whose styles are drawn as vector grid patterns.
pub const PRACTICE_CATEGORY: &str = "practice";

/// Default page size used when a query leaves `limit` unset.
pub const DEFAULT_PAGE_LIMIT: usize = 12;

/// A named group of paper styles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// A decorative paper template as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub id: String,
    pub name: String,
    pub category_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub full_image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a style's content reaches the preview surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Drawn by the pattern collaborator; recolorable.
    Vector,
    /// Loaded from `full_image_url`; only filterable.
    Raster,
}

impl Style {
    pub fn content_kind(&self) -> ContentKind {
        if self.category_id == PRACTICE_CATEGORY {
            ContentKind::Vector
        } else {
            ContentKind::Raster
        }
    }

    /// Case-insensitive substring match on the name or any tag.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
    }
}

/// Filter and pagination parameters for [`crate::Catalog::list_styles`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl StyleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Zero is treated like an unset limit.
    pub fn effective_limit(&self) -> usize {
        match self.limit {
            Some(0) | None => DEFAULT_PAGE_LIMIT,
            Some(limit) => limit,
        }
    }

    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    /// Applies the category and search filters, ignoring empty strings.
    pub fn accepts(&self, style: &Style) -> bool {
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if style.category_id != category {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            if !style.matches_search(search) {
                return false;
            }
        }
        true
    }
}

/// One page of styles plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePage {
    pub styles: Vec<Style>,
    pub total: usize,
    pub has_more: bool,
}

impl StylePage {
    /// Slices `matches` according to the query's offset and limit.
    pub fn paginate(matches: Vec<Style>, query: &StyleQuery) -> Self {
        let limit = query.effective_limit();
        let offset = query.effective_offset();
        let total = matches.len();
        let styles = matches.into_iter().skip(offset).take(limit).collect();
        Self {
            styles,
            total,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::model::{Category, Style, StylePage, StyleQuery};

const BUILTIN_CATEGORIES: &str = include_str!("../data/categories.json");
const BUILTIN_STYLES: &str = include_str!("../data/styles.json");

/// Number of styles returned by [`Catalog::popular_styles`].
pub const POPULAR_LIMIT: usize = 6;
/// Default limit for [`Catalog::related_styles`] callers.
pub const RELATED_LIMIT: usize = 4;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog data {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse catalog {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog backend unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to categories and styles.
///
/// Lookups of missing ids yield `Ok(None)` or an empty list; errors are
/// reserved for backend failures.
pub trait Catalog {
    fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;
    fn list_styles(&self, query: &StyleQuery) -> Result<StylePage, CatalogError>;
    fn style_by_id(&self, id: &str) -> Result<Option<Style>, CatalogError>;
    fn related_styles(&self, id: &str, limit: usize) -> Result<Vec<Style>, CatalogError>;
    fn popular_styles(&self) -> Result<Vec<Style>, CatalogError>;
    fn category_by_id(&self, id: &str) -> Result<Option<Category>, CatalogError>;
}

/// Catalog served from memory, usually loaded from a pair of JSON documents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    categories: Vec<Category>,
    styles: Vec<Style>,
}

impl InMemoryCatalog {
    pub fn new(mut categories: Vec<Category>, styles: Vec<Style>) -> Self {
        categories.sort_by_key(|category| category.sort_order);
        Self { categories, styles }
    }

    pub fn from_json(categories: &str, styles: &str) -> Result<Self, CatalogError> {
        let categories: Vec<Category> =
            serde_json::from_str(categories).map_err(|source| CatalogError::Parse {
                what: "categories",
                source,
            })?;
        let styles: Vec<Style> =
            serde_json::from_str(styles).map_err(|source| CatalogError::Parse {
                what: "styles",
                source,
            })?;
        debug!(
            categories = categories.len(),
            styles = styles.len(),
            "catalog loaded"
        );
        Ok(Self::new(categories, styles))
    }

    /// Loads `categories.json` and `styles.json` from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let categories = read_file(&dir.join("categories.json"))?;
        let styles = read_file(&dir.join("styles.json"))?;
        Self::from_json(&categories, &styles)
    }

    /// Catalog bundled with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATEGORIES, BUILTIN_STYLES)
    }

    pub fn styles(&self) -> &[Style] {
        &self.styles
    }
}

fn read_file(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })
}

impl Catalog for InMemoryCatalog {
    fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.categories.clone())
    }

    fn list_styles(&self, query: &StyleQuery) -> Result<StylePage, CatalogError> {
        let matches: Vec<Style> = self
            .styles
            .iter()
            .filter(|style| query.accepts(style))
            .cloned()
            .collect();
        Ok(StylePage::paginate(matches, query))
    }

    fn style_by_id(&self, id: &str) -> Result<Option<Style>, CatalogError> {
        Ok(self.styles.iter().find(|style| style.id == id).cloned())
    }

    fn related_styles(&self, id: &str, limit: usize) -> Result<Vec<Style>, CatalogError> {
        let Some(current) = self.styles.iter().find(|style| style.id == id) else {
            return Ok(Vec::new());
        };
        Ok(self
            .styles
            .iter()
            .filter(|style| style.category_id == current.category_id && style.id != id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn popular_styles(&self) -> Result<Vec<Style>, CatalogError> {
        Ok(self.styles.iter().take(POPULAR_LIMIT).cloned().collect())
    }

    fn category_by_id(&self, id: &str) -> Result<Option<Category>, CatalogError> {
        Ok(self
            .categories
            .iter()
            .find(|category| category.id == id)
            .cloned())
    }
}

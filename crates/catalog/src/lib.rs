//! Style and category catalog shared by the preview engine and the CLI.

pub mod catalog;
pub mod model;

pub use catalog::{Catalog, CatalogError, InMemoryCatalog, POPULAR_LIMIT, RELATED_LIMIT};
pub use model::{
    Category, ContentKind, Style, StylePage, StyleQuery, DEFAULT_PAGE_LIMIT, PRACTICE_CATEGORY,
};

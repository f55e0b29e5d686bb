use std::time::Duration;

use papercraft_catalog::{Catalog, CatalogError, Category, Style, StyleQuery};
use tracing::warn;

use crate::job::PrintHistoryRecord;
use crate::queue::{PrintQueue, QueueNotice};

/// Session state shared by the views: catalog listings, search, the print
/// queue and the prints made during this session (newest first).
#[derive(Debug, Default)]
pub struct AppState {
    categories: Vec<Category>,
    styles: Vec<Style>,
    search_query: String,
    selected_category: Option<String>,
    loading: bool,
    queue: PrintQueue,
    history: Vec<PrintHistoryRecord>,
}

impl AppState {
    pub fn new(queue: PrintQueue) -> Self {
        Self {
            queue,
            ..Self::default()
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.selected_category.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn history(&self) -> &[PrintHistoryRecord] {
        &self.history
    }

    pub fn queue(&self) -> &PrintQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut PrintQueue {
        &mut self.queue
    }

    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub fn set_styles(&mut self, styles: Vec<Style>) {
        self.styles = styles;
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn select_category(&mut self, category: Option<String>) {
        self.selected_category = category;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn add_to_history(&mut self, record: PrintHistoryRecord) {
        self.history.insert(0, record);
    }

    /// Query matching the current category selection and search text.
    pub fn style_query(&self) -> StyleQuery {
        let search = self.search_query.trim();
        StyleQuery {
            category: self.selected_category.clone(),
            search: (!search.is_empty()).then(|| search.to_string()),
            limit: None,
            offset: None,
        }
    }

    /// Replaces the category list; on failure the previous list stays.
    pub fn refresh_categories<C: Catalog + ?Sized>(
        &mut self,
        catalog: &C,
    ) -> Result<(), CatalogError> {
        self.loading = true;
        let result = catalog.list_categories();
        self.loading = false;
        match result {
            Ok(categories) => {
                self.categories = categories;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to load categories");
                Err(err)
            }
        }
    }

    /// Replaces the style list with the first page of [`Self::style_query`];
    /// on failure the previous list stays.
    pub fn refresh_styles<C: Catalog + ?Sized>(&mut self, catalog: &C) -> Result<(), CatalogError> {
        self.loading = true;
        let result = catalog.list_styles(&self.style_query());
        self.loading = false;
        match result {
            Ok(page) => {
                self.styles = page.styles;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to load styles");
                Err(err)
            }
        }
    }

    /// Drives the queue and records completed prints in the session history.
    pub fn advance(&mut self, by: Duration) -> Vec<QueueNotice> {
        self.queue.advance(by);
        let notices = self.queue.drain_notices();
        for notice in &notices {
            if let QueueNotice::PrintCompleted { record, .. } = notice {
                self.add_to_history(record.clone());
            }
        }
        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::PaperSize;
    use crate::queue::{FixedProgress, QueueTimings};
    use crate::settings::PrintSettings;
    use papercraft_catalog::{InMemoryCatalog, StylePage};

    struct BrokenCatalog;

    impl Catalog for BrokenCatalog {
        fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
            Err(CatalogError::Unavailable("offline".into()))
        }
        fn list_styles(&self, _query: &StyleQuery) -> Result<StylePage, CatalogError> {
            Err(CatalogError::Unavailable("offline".into()))
        }
        fn style_by_id(&self, _id: &str) -> Result<Option<Style>, CatalogError> {
            Ok(None)
        }
        fn related_styles(&self, _id: &str, _limit: usize) -> Result<Vec<Style>, CatalogError> {
            Ok(Vec::new())
        }
        fn popular_styles(&self) -> Result<Vec<Style>, CatalogError> {
            Ok(Vec::new())
        }
        fn category_by_id(&self, _id: &str) -> Result<Option<Category>, CatalogError> {
            Ok(None)
        }
    }

    #[test]
    fn refresh_keeps_previous_lists_on_failure() {
        let catalog = InMemoryCatalog::builtin().unwrap();
        let mut state = AppState::default();
        state.refresh_categories(&catalog).unwrap();
        state.refresh_styles(&catalog).unwrap();
        let categories = state.categories().len();
        let styles = state.styles().len();
        assert!(categories > 0 && styles > 0);

        assert!(state.refresh_categories(&BrokenCatalog).is_err());
        assert!(state.refresh_styles(&BrokenCatalog).is_err());
        assert_eq!(state.categories().len(), categories);
        assert_eq!(state.styles().len(), styles);
        assert!(!state.is_loading());
    }

    #[test]
    fn style_query_follows_selection_and_search() {
        let mut state = AppState::default();
        state.select_category(Some("practice".into()));
        state.set_search_query("  grid ");
        let query = state.style_query();
        assert_eq!(query.category.as_deref(), Some("practice"));
        assert_eq!(query.search.as_deref(), Some("grid"));

        state.set_search_query("   ");
        assert!(state.style_query().search.is_none());
    }

    #[test]
    fn completed_prints_land_in_session_history() {
        let catalog = InMemoryCatalog::builtin().unwrap();
        let style = catalog.style_by_id("dot-grid").unwrap().unwrap();
        let queue = PrintQueue::new(QueueTimings::default()).with_progress(FixedProgress(100.0));
        let mut state = AppState::new(queue);

        state.queue_mut().connect();
        state.advance(Duration::from_secs(2));
        let first = state
            .queue_mut()
            .submit(&style, PaperSize::A4, PrintSettings::default());
        let second = state
            .queue_mut()
            .submit(&style, PaperSize::A3, PrintSettings::default());
        state.queue_mut().start(first).unwrap();
        state.advance(Duration::from_millis(500));
        state.queue_mut().start(second).unwrap();
        state.advance(Duration::from_millis(500));

        let history = state.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].job_id, second);
        assert_eq!(history[1].job_id, first);
    }
}

//! Persistence for user preferences, favorite styles and print history.

pub mod favorites;
pub mod history;
pub mod preferences;
pub mod store;
mod user;

use std::path::{Path, PathBuf};

pub use favorites::{Favorite, FavoritesStore};
pub use history::{
    HistoryEntry, HistoryStore, PrintStats, UserHistorySink, HISTORY_LIMIT, RECENT_LIMIT,
};
pub use preferences::{
    Language, Preferences, PreferencesError, PreferencesStore, PrintingPreferences, Theme,
};
pub use store::{JsonTable, StoreError};
pub use user::UserId;

/// 工作區內的資料目錄名稱。 / Name of the data directory inside a workspace.
pub const DATA_DIR: &str = ".papercraft";

/// File locations of every store under one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn for_workspace(workspace: impl AsRef<Path>) -> Self {
        Self {
            root: workspace.as_ref().join(DATA_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn preferences(&self) -> PathBuf {
        self.root.join("preferences.json")
    }

    pub fn favorites(&self) -> PathBuf {
        self.root.join("favorites.json")
    }

    pub fn history(&self) -> PathBuf {
        self.root.join("history.json")
    }
}

use std::path::Path;

use chrono::{DateTime, Utc};
use papercraft_catalog::Style;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{JsonTable, StoreError};
use crate::user::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: u64,
    pub user_id: UserId,
    pub style_id: String,
    pub style_name: String,
    pub style_category: String,
    pub created_at: DateTime<Utc>,
}

/// 收藏清單，依使用者分開，最新的在前。 / Favorite styles per user, newest first.
#[derive(Debug, Clone)]
pub struct FavoritesStore {
    table: JsonTable<Favorite>,
}

impl FavoritesStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            table: JsonTable::load(path)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.table.path()
    }

    pub fn list(&self, user: &UserId) -> Vec<&Favorite> {
        self.table
            .rows()
            .iter()
            .filter(|fav| &fav.user_id == user)
            .collect()
    }

    pub fn is_favorite(&self, user: &UserId, style_id: &str) -> bool {
        self.table
            .rows()
            .iter()
            .any(|fav| &fav.user_id == user && fav.style_id == style_id)
    }

    pub fn count(&self, user: &UserId) -> usize {
        self.list(user).len()
    }

    pub fn by_category(&self, user: &UserId, category_id: &str) -> Vec<&Favorite> {
        self.table
            .rows()
            .iter()
            .filter(|fav| &fav.user_id == user && fav.style_category == category_id)
            .collect()
    }

    /// Returns `false` when the style was already a favorite.
    pub fn add(&mut self, user: &UserId, style: &Style) -> Result<bool, StoreError> {
        if self.is_favorite(user, &style.id) {
            return Ok(false);
        }
        let favorite = Favorite {
            id: self.next_id(),
            user_id: user.clone(),
            style_id: style.id.clone(),
            style_name: style.name.clone(),
            style_category: style.category_id.clone(),
            created_at: Utc::now(),
        };
        self.table.modify(|rows| rows.insert(0, favorite))?;
        info!(user = %user, style = %style.id, "favorite added");
        Ok(true)
    }

    pub fn remove(&mut self, user: &UserId, style_id: &str) -> Result<bool, StoreError> {
        if !self.is_favorite(user, style_id) {
            return Ok(false);
        }
        self.table
            .modify(|rows| rows.retain(|fav| !(&fav.user_id == user && fav.style_id == style_id)))?;
        info!(user = %user, style = %style_id, "favorite removed");
        Ok(true)
    }

    /// Flips the favorite state and returns the new one.
    pub fn toggle(&mut self, user: &UserId, style: &Style) -> Result<bool, StoreError> {
        if self.is_favorite(user, &style.id) {
            self.remove(user, &style.id)?;
            Ok(false)
        } else {
            self.add(user, style)?;
            Ok(true)
        }
    }

    /// Removes every favorite of `user`, returning how many were dropped.
    pub fn clear(&mut self, user: &UserId) -> Result<usize, StoreError> {
        let removed = self.table.modify(|rows| {
            let before = rows.len();
            rows.retain(|fav| &fav.user_id != user);
            before - rows.len()
        })?;
        info!(user = %user, removed, "favorites cleared");
        Ok(removed)
    }

    fn next_id(&self) -> u64 {
        self.table.rows().iter().map(|fav| fav.id).max().unwrap_or(0) + 1
    }
}

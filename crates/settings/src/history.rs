use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use papercraft_printing::{
    HistorySink, HistorySinkError, PaperSize, PrintHistoryRecord, PrintSettings,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{JsonTable, StoreError};
use crate::user::UserId;

/// Entries kept per user; older ones are dropped on append.
pub const HISTORY_LIMIT: usize = 100;
/// Length of the "recently used" lists.
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub user_id: UserId,
    pub record: PrintHistoryRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintStats {
    pub total_prints: usize,
    pub unique_styles: usize,
    pub paper_size_counts: BTreeMap<String, usize>,
    pub most_used_paper_size: String,
}

/// 列印紀錄，依使用者分開，最新的在前。 / Print history per user, newest first.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    table: JsonTable<HistoryEntry>,
}

impl HistoryStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            table: JsonTable::load(path)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.table.path()
    }

    pub fn list(&self, user: &UserId) -> Vec<&HistoryEntry> {
        self.table
            .rows()
            .iter()
            .filter(|entry| &entry.user_id == user)
            .collect()
    }

    /// Prepends `record` and trims the user's history to [`HISTORY_LIMIT`].
    pub fn append(
        &mut self,
        user: &UserId,
        record: PrintHistoryRecord,
    ) -> Result<u64, StoreError> {
        let id = self.table.rows().iter().map(|entry| entry.id).max().unwrap_or(0) + 1;
        let style = record.style_id.clone();
        let entry = HistoryEntry {
            id,
            user_id: user.clone(),
            record,
        };
        self.table.modify(|rows| {
            rows.insert(0, entry);
            let mut kept = 0;
            rows.retain(|entry| {
                if &entry.user_id != user {
                    return true;
                }
                kept += 1;
                kept <= HISTORY_LIMIT
            });
        })?;
        info!(user = %user, entry = id, style = %style, "print recorded");
        Ok(id)
    }

    /// Returns `false` when the user has no entry with that id.
    pub fn delete(&mut self, user: &UserId, id: u64) -> Result<bool, StoreError> {
        let owned = |entry: &HistoryEntry| &entry.user_id == user && entry.id == id;
        if !self.table.rows().iter().any(owned) {
            return Ok(false);
        }
        self.table.modify(|rows| rows.retain(|entry| !owned(entry)))?;
        Ok(true)
    }

    pub fn clear(&mut self, user: &UserId) -> Result<usize, StoreError> {
        let removed = self.table.modify(|rows| {
            let before = rows.len();
            rows.retain(|entry| &entry.user_id != user);
            before - rows.len()
        })?;
        info!(user = %user, removed, "print history cleared");
        Ok(removed)
    }

    /// Distinct paper sizes in order of last use.
    pub fn recent_paper_sizes(&self, user: &UserId) -> Vec<PaperSize> {
        let mut sizes: Vec<PaperSize> = Vec::new();
        for entry in self.list(user) {
            if sizes.len() == RECENT_LIMIT {
                break;
            }
            if !sizes.contains(&entry.record.paper_size) {
                sizes.push(entry.record.paper_size);
            }
        }
        sizes
    }

    pub fn recent_settings(&self, user: &UserId) -> Vec<PrintSettings> {
        self.list(user)
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|entry| entry.record.settings.clone())
            .collect()
    }

    /// Entries bucketed by their UTC calendar day, newest day first.
    pub fn grouped_by_date(&self, user: &UserId) -> Vec<(NaiveDate, Vec<&HistoryEntry>)> {
        let mut groups: Vec<(NaiveDate, Vec<&HistoryEntry>)> = Vec::new();
        for entry in self.list(user) {
            let day = entry.record.created_at.date_naive();
            match groups.iter_mut().find(|(date, _)| *date == day) {
                Some((_, entries)) => entries.push(entry),
                None => groups.push((day, vec![entry])),
            }
        }
        groups.sort_by(|a, b| b.0.cmp(&a.0));
        groups
    }

    pub fn stats(&self, user: &UserId) -> PrintStats {
        let entries = self.list(user);
        let unique_styles = entries
            .iter()
            .map(|entry| entry.record.style_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        // First-seen order breaks ties in favour of the more recent size.
        let mut order: Vec<String> = Vec::new();
        let mut paper_size_counts = BTreeMap::new();
        for entry in &entries {
            let key = entry.record.paper_size.id().to_string();
            if !paper_size_counts.contains_key(&key) {
                order.push(key.clone());
            }
            *paper_size_counts.entry(key).or_insert(0) += 1;
        }
        let mut most_used_paper_size = PaperSize::A4.id().to_string();
        let mut best = 0;
        for key in order {
            let count = paper_size_counts.get(&key).copied().unwrap_or(0);
            if count > best {
                best = count;
                most_used_paper_size = key;
            }
        }

        PrintStats {
            total_prints: entries.len(),
            unique_styles,
            paper_size_counts,
            most_used_paper_size,
        }
    }
}

/// Writes completed jobs into a [`HistoryStore`] on behalf of one user.
#[derive(Debug)]
pub struct UserHistorySink {
    store: HistoryStore,
    user: UserId,
}

impl UserHistorySink {
    pub fn new(store: HistoryStore, user: UserId) -> Self {
        Self { store, user }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }
}

impl HistorySink for UserHistorySink {
    fn record(&mut self, record: &PrintHistoryRecord) -> Result<(), HistorySinkError> {
        self.store
            .append(&self.user, record.clone())
            .map(|_| ())
            .map_err(HistorySinkError::new)
    }
}

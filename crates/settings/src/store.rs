use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 讀取 JSON 檔案；檔案不存在時回傳 `None`。 / Reads a JSON document, `None` when the file is missing.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// 以暫存檔加改名的方式寫入。 / Writes pretty JSON through a `.tmp` sibling and a rename.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let payload = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, payload.as_bytes()).map_err(|source| StoreError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = payload.len(), "store written");
    Ok(())
}

/// A list of records persisted as one JSON array.
///
/// Mutations run against a copy and are only kept once the file has been
/// written, so a failed write leaves the table as it was.
#[derive(Debug, Clone)]
pub struct JsonTable<R> {
    path: PathBuf,
    rows: Vec<R>,
}

impl<R> JsonTable<R>
where
    R: Clone + Serialize + DeserializeOwned,
{
    /// Opens the table; a missing file is an empty table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let rows = read_json(&path)?.unwrap_or_default();
        Ok(Self { path, rows })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Applies `op` and persists the result.
    pub fn modify<T, F>(&mut self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<R>) -> T,
    {
        let mut rows = self.rows.clone();
        let outcome = op(&mut rows);
        write_json(&self.path, &rows)?;
        self.rows = rows;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty() {
        let temp = tempdir().expect("tempdir");
        let table: JsonTable<u32> = JsonTable::load(temp.path().join("none.json")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn modify_persists_and_leaves_no_tmp_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested/table.json");
        let mut table: JsonTable<u32> = JsonTable::load(&path).unwrap();
        let pushed = table.modify(|rows| {
            rows.extend([1, 2, 3]);
            rows.len()
        });
        assert_eq!(pushed.unwrap(), 3);
        assert!(!path.with_extension("tmp").exists());

        let reloaded: JsonTable<u32> = JsonTable::load(&path).unwrap();
        assert_eq!(reloaded.rows(), &[1, 2, 3]);
    }

    #[test]
    fn failed_write_keeps_rows() {
        let temp = tempdir().expect("tempdir");
        // A directory where the file should be makes the rename fail.
        let path = temp.path().join("table.json");
        fs::create_dir_all(path.join("blocker")).unwrap();
        let mut table: JsonTable<u32> = JsonTable {
            path: path.clone(),
            rows: vec![7],
        };
        assert!(table.modify(|rows| rows.clear()).is_err());
        assert_eq!(table.rows(), &[7]);
    }

    #[test]
    fn corrupt_file_reports_path() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        let err = JsonTable::<u32>::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use papercraft_printing::{PaperSize, PrintQuality, PrintSettings, QueueTimings};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::{read_json, write_json, StoreError};

const PREFERENCES_VERSION: u32 = 1;

/// Preferences files share the table error type.
pub type PreferencesError = StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

/// 使用者偏好設定。 / User-level preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub version: u32,
    pub theme: Theme,
    pub language: Language,
    pub notifications_enabled: bool,
    pub default_paper_size: PaperSize,
    pub default_print_quality: PrintQuality,
    pub auto_save_favorites: bool,
    pub privacy_mode: bool,
    pub printing: PrintingPreferences,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            theme: Theme::default(),
            language: Language::default(),
            notifications_enabled: true,
            default_paper_size: PaperSize::A4,
            default_print_quality: PrintQuality::Normal,
            auto_save_favorites: true,
            privacy_mode: false,
            printing: PrintingPreferences::default(),
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        }
        self.printing.sanitize();
    }

    /// Settings a new preview session starts from.
    pub fn initial_print_settings(&self) -> PrintSettings {
        let mut settings = PrintSettings::default();
        settings.set_quality(self.default_print_quality);
        settings
    }
}

/// 模擬列印佇列的時間參數。 / Timings of the simulated print queue, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintingPreferences {
    pub tick_interval_ms: u64,
    pub completed_removal_ms: u64,
    pub cancelled_removal_ms: u64,
    pub max_progress_step: f32,
}

impl Default for PrintingPreferences {
    fn default() -> Self {
        let timings = QueueTimings::default();
        Self {
            tick_interval_ms: duration_ms(timings.tick_interval),
            completed_removal_ms: duration_ms(timings.completed_removal),
            cancelled_removal_ms: duration_ms(timings.cancelled_removal),
            max_progress_step: timings.max_progress_step,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl PrintingPreferences {
    fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.tick_interval_ms == 0 {
            self.tick_interval_ms = defaults.tick_interval_ms;
        }
        if !self.max_progress_step.is_finite() || self.max_progress_step <= 0.0 {
            self.max_progress_step = defaults.max_progress_step;
        }
        self.max_progress_step = self.max_progress_step.min(100.0);
    }

    pub fn timings(&self) -> QueueTimings {
        QueueTimings {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            completed_removal: Duration::from_millis(self.completed_removal_ms),
            cancelled_removal: Duration::from_millis(self.cancelled_removal_ms),
            max_progress_step: self.max_progress_step,
            ..QueueTimings::default()
        }
    }
}

#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    /// 載入偏好設定；檔案不存在時使用預設值。 / Loads preferences, falling back to defaults when the file is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        let mut data: Preferences = read_json(&path)?.unwrap_or_default();
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn update<F>(&mut self, op: F) -> Result<(), PreferencesError>
    where
        F: FnOnce(&mut Preferences),
    {
        let mut data = self.data.clone();
        op(&mut data);
        self.overwrite(data)
    }

    pub fn overwrite(&mut self, preferences: Preferences) -> Result<(), PreferencesError> {
        let mut data = preferences;
        data.sanitize();
        write_json(&self.path, &data)?;
        self.data = data;
        info!(path = %self.path.display(), "preferences saved");
        Ok(())
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        write_json(&self.path, &self.data)
    }

    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<(), PreferencesError> {
        write_json(path.as_ref(), &self.data)
    }

    /// 匯入前先備份現有檔案為 `.bak`。 / Imports from `source`, keeping a `.bak` copy of the current file.
    pub fn import_from(&mut self, source: impl AsRef<Path>) -> Result<(), PreferencesError> {
        let source = source.as_ref();
        let data: Preferences = match read_json(source)? {
            Some(data) => data,
            None => {
                return Err(StoreError::Read {
                    path: source.to_path_buf(),
                    source: std::io::ErrorKind::NotFound.into(),
                })
            }
        };
        self.backup_existing()?;
        self.overwrite(data)
    }

    fn backup_existing(&self) -> Result<(), PreferencesError> {
        if !self.path.exists() {
            return Ok(());
        }
        let backup = self.path.with_extension("bak");
        fs::copy(&self.path, &backup).map_err(|source| {
            warn!(path = %backup.display(), error = %source, "preferences backup failed");
            StoreError::Write {
                path: backup.clone(),
                source,
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_queue() {
        let prefs = Preferences::default();
        assert_eq!(prefs.printing.tick_interval_ms, 500);
        assert_eq!(prefs.printing.completed_removal_ms, 2000);
        assert_eq!(prefs.printing.cancelled_removal_ms, 1000);
        assert_eq!(prefs.printing.timings(), QueueTimings::default());
    }

    #[test]
    fn sanitize_repairs_printing_block() {
        let mut prefs = Preferences {
            version: 0,
            ..Preferences::default()
        };
        prefs.printing.tick_interval_ms = 0;
        prefs.printing.max_progress_step = -3.0;
        prefs.sanitize();
        assert_eq!(prefs.version, PREFERENCES_VERSION);
        assert_eq!(prefs.printing.tick_interval_ms, 500);
        assert_eq!(prefs.printing.max_progress_step, 20.0);
    }

    #[test]
    fn initial_settings_take_quality() {
        let prefs = Preferences {
            default_print_quality: PrintQuality::High,
            ..Preferences::default()
        };
        let settings = prefs.initial_print_settings();
        assert_eq!(settings.quality(), PrintQuality::High);
        assert_eq!(settings.copies(), 1);
    }

    #[test]
    fn enums_use_lowercase_names() {
        let json = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(json["theme"], "light");
        assert_eq!(json["language"], "zh");
        assert_eq!(json["default_paper_size"], "A4");
        assert_eq!(json["default_print_quality"], "normal");
    }
}

//! Session settings.
//!
//! Settings are an explicit value passed to [`crate::store::AnnotationStore`]
//! and shared by its annotations. Files may be JSON or YAML; every field is
//! optional.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::repeater::DEFAULT_INDEX_FLAG;
use crate::config::CompileOptions;
use crate::error::LabelcraftError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Select a region right after it is created.
    pub select_after_create: bool,
    /// Minimum delay between two autosaves.
    pub autosave_delay_ms: u64,
    /// Maximum number of undo snapshots; unbounded when unset.
    pub history_limit: Option<usize>,
    /// Index placeholder for repeaters without an `indexFlag`.
    pub repeater_index_flag: String,
    /// Serialize classification results with empty payloads.
    pub keep_empty_results: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            select_after_create: false,
            autosave_delay_ms: 5000,
            history_limit: None,
            repeater_index_flag: DEFAULT_INDEX_FLAG.to_string(),
            keep_empty_results: false,
        }
    }
}

impl Settings {
    /// Loads settings from a `.json`, `.yaml` or `.yml` file.
    pub fn from_path(path: &Path) -> Result<Self, LabelcraftError> {
        let text = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => {
                serde_json::from_str(&text).map_err(|source| LabelcraftError::SettingsParse {
                    path: path.to_path_buf(),
                    message: source.to_string(),
                })
            }
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&text).map_err(|source| LabelcraftError::SettingsParse {
                    path: path.to_path_buf(),
                    message: source.to_string(),
                })
            }
            _ => Err(LabelcraftError::UnsupportedFormat(format!(
                "settings file '{}' (supported: .json, .yaml, .yml)",
                path.display()
            ))),
        }
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Compiler options derived from these settings.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            index_flag: self.repeater_index_flag.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(!settings.select_after_create);
        assert_eq!(settings.autosave_delay(), Duration::from_secs(5));
        assert_eq!(settings.repeater_index_flag, "{{idx}}");
    }

    #[test]
    fn loads_partial_yaml() {
        let file = write_temp(".yaml", "select_after_create: true\nhistory_limit: 20\n");
        let settings = Settings::from_path(file.path()).unwrap();
        assert!(settings.select_after_create);
        assert_eq!(settings.history_limit, Some(20));
        assert_eq!(settings.autosave_delay_ms, 5000);
    }

    #[test]
    fn loads_json() {
        let file = write_temp(".json", r#"{"autosave_delay_ms": 250, "repeater_index_flag": "[i]"}"#);
        let settings = Settings::from_path(file.path()).unwrap();
        assert_eq!(settings.autosave_delay_ms, 250);
        assert_eq!(settings.compile_options().index_flag, "[i]");
    }

    #[test]
    fn rejects_bad_files() {
        let file = write_temp(".json", "{not json");
        assert!(matches!(
            Settings::from_path(file.path()),
            Err(LabelcraftError::SettingsParse { .. })
        ));
        let file = write_temp(".toml", "x = 1");
        assert!(matches!(
            Settings::from_path(file.path()),
            Err(LabelcraftError::UnsupportedFormat(_))
        ));
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::codec::FallbackCharset;

/// Configuration of the metadata core.
///
/// Missing fields take their default values, so a config file only needs the
/// settings it changes.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_editor::config::EditorConfig;
///
/// // From a JSON file
/// let config = EditorConfig::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = EditorConfig::default();
/// config.group_priority.insert("Xmp.photoshop".into(), -40);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Sort key of tag groups; lower values come first, unlisted groups
    /// count as 0.
    pub group_priority: BTreeMap<String, i32>,
    /// Charset for binary payloads shown as text.
    pub fallback_charset: FallbackCharset,
}

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "exif-editor.json";

/// Built-in group order: core EXIF groups first, then Dublin Core, GPS and
/// IPTC.
pub const DEFAULT_GROUP_PRIORITY: &[(&str, i32)] = &[
    ("Exif.Image", -100),
    ("Exif.Photo", -80),
    ("Xmp.dc", -50),
    ("Exif.GPSInfo", -30),
    ("Iptc.Application2", -29),
];

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            group_priority: DEFAULT_GROUP_PRIORITY
                .iter()
                .map(|&(group, priority)| (group.to_string(), priority))
                .collect(),
            fallback_charset: FallbackCharset::default(),
        }
    }
}

impl EditorConfig {
    /// `path`, or [`DEFAULT_CONFIG_FILE`] in the working directory.
    pub fn resolve(path: Option<&Path>) -> PathBuf {
        path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf)
    }

    /// Load config from `path` (or the default file); a missing file yields
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve(path);
        if !config_path.exists() {
            log::warn!("Config file not found at {}. Using defaults.", config_path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Write config as pretty JSON and return where it went.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = Self::resolve(path);
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        log::info!("Config saved to {}", config_path.display());
        Ok(config_path)
    }

    /// Priority of `group`; 0 when unlisted.
    pub fn priority(&self, group: &str) -> i32 {
        self.group_priority.get(group).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.priority("Exif.Image"), -100);
        assert_eq!(config.priority("Xmp.xmp"), 0);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "fallback_charset": "latin1" }"#).unwrap();
        let config = EditorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.fallback_charset, FallbackCharset::Latin1);
        assert_eq!(config.priority("Exif.Photo"), -80);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = EditorConfig::default();
        config.group_priority.insert("Xmp.photoshop".into(), -40);
        assert_eq!(config.save(Some(&path)).unwrap(), path);
        assert_eq!(EditorConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn default_file_is_relative() {
        assert_eq!(EditorConfig::resolve(None), PathBuf::from(DEFAULT_CONFIG_FILE));
        let explicit = Path::new("/tmp/custom.json");
        assert_eq!(EditorConfig::resolve(Some(explicit)), explicit);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(EditorConfig::load(Some(&path)).is_err());
    }
}

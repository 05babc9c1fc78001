use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::i18n::Locale;
use crate::store::{StoreOptions, DEFAULT_SAVE_DEBOUNCE};
use crate::templates::Template;

const MAX_DEBOUNCE_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locale: Locale,
    pub save_debounce_ms: u64,
    pub data_dir: Option<PathBuf>,
    pub default_template: Template,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            locale: Locale::default(),
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE.as_millis() as u64,
            data_dir: None,
            default_template: Template::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(data).context("parsing config file")
    }

    /// Reads `path`; a missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        Self::from_yaml(&data).with_context(|| format!("in {:?}", path))
    }

    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            locale: self.locale,
            save_debounce: Duration::from_millis(self.save_debounce_ms.min(MAX_DEBOUNCE_MS)),
            default_template: self.default_template,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "taskboard").map(|dirs| dirs.config_dir().join("config.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_missing_config_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            Config::load_from(&tmp.path().join("nope.yml")).unwrap(),
            Config::default()
        );
    }

    #[test]
    fn partial_yaml_overrides_fields() {
        let config = Config::from_yaml("locale: de\nsave_debounce_ms: 400\n").unwrap();
        assert_eq!(config.locale, Locale::De);
        assert_eq!(config.save_debounce_ms, 400);
        assert_eq!(config.default_template, Template::Basic);
        assert_eq!(config.store_options().save_debounce, Duration::from_millis(400));
    }

    #[test]
    fn debounce_is_clamped() {
        let config = Config::from_yaml("save_debounce_ms: 999999").unwrap();
        assert_eq!(
            config.store_options().save_debounce,
            Duration::from_millis(MAX_DEBOUNCE_MS)
        );
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(Config::from_yaml("locale: [unclosed").is_err());
        assert!(Config::from_yaml("locale: klingon").is_err());
    }

    #[test]
    fn reads_file_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yml");
        fs::write(&path, "default_template: development\ndata_dir: /tmp/boards\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_template, Template::Development);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/boards")));
    }
}

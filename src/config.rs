use crate::grid::DEFAULT_MARKERS;
use crate::storage;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Overrides project/global discovery of the events file.
    pub events_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    pub markers_per_day: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            events_file: None,
            log_file: None,
            log_filter: None,
            markers_per_day: DEFAULT_MARKERS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Config> {
        let path = storage::config_dir()?.join(CONFIG_FILE);
        Config::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config =
            serde_yaml::from_str(&data).with_context(|| format!("parsing {:?}", path))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.markers_per_day, 3);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "events_file: /tmp/eventos.json\nlog_filter: debug\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.events_file, Some(PathBuf::from("/tmp/eventos.json")));
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
        assert_eq!(config.markers_per_day, DEFAULT_MARKERS);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "markers_per_day: [1, 2").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}

//! User configuration: a flat key/value TOML file.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error, Result,
    analytics::{DEFAULT_ATTENTION_THRESHOLD, DEFAULT_HISTORY_LIMIT, DEFAULT_TREND_WINDOW},
};

pub const APP_DIR: &str = "pushpull";

pub const DB_PATH: &str = "db_path";
pub const TREND_WINDOW: &str = "trend_window";
pub const ATTENTION_THRESHOLD: &str = "attention_threshold";
pub const HISTORY_LIMIT: &str = "history_limit";

/// Keys the application reads. Others are stored but ignored.
pub const KNOWN_KEYS: [&str; 4] = [DB_PATH, TREND_WINDOW, ATTENTION_THRESHOLD, HISTORY_LIMIT];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub map: BTreeMap<String, String>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR))
}

impl Config {
    /// Read the file at `path`. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Store a value. Values of known keys must parse as their type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let check = match key {
            TREND_WINDOW | HISTORY_LIMIT => parse_value::<usize>(key, value).and_then(|n| {
                if n == 0 {
                    Err(Error::Config(format!("`{key}` must be at least 1")))
                } else {
                    Ok(())
                }
            }),
            ATTENTION_THRESHOLD => parse_value::<f64>(key, value).map(drop),
            _ => Ok(()),
        };
        check?;
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Option<String> {
        self.map.remove(key)
    }

    /// Database file: the `db_path` key, else the platform data directory.
    pub fn db_path(&self) -> Option<PathBuf> {
        match self.get(DB_PATH) {
            Some(path) => Some(PathBuf::from(path)),
            None => default_data_dir().map(|d| d.join("pushpull.db")),
        }
    }

    pub fn trend_window(&self) -> Result<usize> {
        self.typed(TREND_WINDOW, DEFAULT_TREND_WINDOW)
    }

    pub fn attention_threshold(&self) -> Result<f64> {
        self.typed(ATTENTION_THRESHOLD, DEFAULT_ATTENTION_THRESHOLD)
    }

    pub fn history_limit(&self) -> Result<usize> {
        self.typed(HISTORY_LIMIT, DEFAULT_HISTORY_LIMIT)
    }

    fn typed<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            Some(raw) => parse_value(key, raw),
            None => Ok(default),
        }
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value `{raw}` for `{key}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_fall_back_to_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.trend_window().unwrap(), DEFAULT_TREND_WINDOW);
        assert_eq!(cfg.attention_threshold().unwrap(), DEFAULT_ATTENTION_THRESHOLD);
        assert_eq!(cfg.history_limit().unwrap(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn set_validates_known_keys() {
        let mut cfg = Config::default();
        cfg.set(TREND_WINDOW, "8").unwrap();
        cfg.set(ATTENTION_THRESHOLD, "-5.5").unwrap();
        cfg.set("editor", "vim").unwrap();
        assert_eq!(cfg.trend_window().unwrap(), 8);
        assert_eq!(cfg.attention_threshold().unwrap(), -5.5);

        assert!(matches!(cfg.set(TREND_WINDOW, "zero"), Err(Error::Config(_))));
        assert!(matches!(cfg.set(HISTORY_LIMIT, "0"), Err(Error::Config(_))));
        assert_eq!(cfg.get(TREND_WINDOW), Some("8"));
    }

    #[test]
    fn db_path_override() {
        let mut cfg = Config::default();
        cfg.set(DB_PATH, "/tmp/lifts.db").unwrap();
        assert_eq!(cfg.db_path(), Some(PathBuf::from("/tmp/lifts.db")));
    }
}

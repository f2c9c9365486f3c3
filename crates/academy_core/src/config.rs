//! Store connection configuration.
//!
//! # Invariants
//! - Every field has a default, so an empty JSON object is a valid config.
//! - Managers receive these values at construction; nothing reads globals.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_SQLITE_PATH: &str = "academy.db";
const DEFAULT_DOCUMENT_ROOT: &str = "academy_docs";
const DEFAULT_DATABASE_NAME: &str = "academy";
const DEFAULT_ADVISOR_QUOTA: u32 = 5;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "malformed config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Where both stores live and how many advisors each student takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite database file.
    pub sqlite_path: PathBuf,
    /// Directory holding document databases.
    pub document_root: PathBuf,
    /// Database directory name under `document_root`.
    pub database_name: String,
    pub advisor_quota: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            document_root: PathBuf::from(DEFAULT_DOCUMENT_ROOT),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            advisor_quota: DEFAULT_ADVISOR_QUOTA,
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content).map_err(ConfigError::Json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database_name cannot be empty".to_string(),
            ));
        }
        if self.database_name.contains(['/', '\\']) || self.database_name.starts_with('.') {
            return Err(ConfigError::Invalid(format!(
                "database_name `{}` must be a plain directory name",
                self.database_name
            )));
        }
        Ok(())
    }

    /// Directory handed to the document store manager.
    pub fn document_database_dir(&self) -> PathBuf {
        self.document_root.join(&self.database_name)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig};
    use std::path::PathBuf;

    #[test]
    fn empty_object_yields_defaults() {
        let config = StoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.advisor_quota, 5);
        assert_eq!(
            config.document_database_dir(),
            PathBuf::from("academy_docs/academy")
        );
    }

    #[test]
    fn partial_config_overrides_named_fields() {
        let config =
            StoreConfig::from_json_str(r#"{"sqlite_path": "/tmp/a.db", "advisor_quota": 2}"#)
                .unwrap();
        assert_eq!(config.sqlite_path, PathBuf::from("/tmp/a.db"));
        assert_eq!(config.advisor_quota, 2);
        assert_eq!(config.database_name, "academy");
    }

    #[test]
    fn unknown_fields_and_path_like_names_are_rejected() {
        assert!(matches!(
            StoreConfig::from_json_str(r#"{"host": "localhost"}"#).unwrap_err(),
            ConfigError::Json(_)
        ));
        assert!(matches!(
            StoreConfig::from_json_str(r#"{"database_name": "../x"}"#).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }
}

//! JSON settings for embedding callers and the CLI.
//!
//! # Responsibility
//! - Parse database location, logging options and model declarations.
//! - Turn model declarations into a validated `ModelRegistry`.
//!
//! # Invariants
//! - A relative `database_path` is resolved against the settings file's
//!   directory when loaded from disk.
//! - `log_level` is normalized at parse time; unsupported values fail.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, normalize_level, LoggingError};
use crate::model::registry::{ModelRegistry, OnDelete, RegistryError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// One relation declared on a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDeclaration {
    pub related: String,
    pub foreign_key: String,
    #[serde(default)]
    pub on_delete: OnDelete,
}

/// One soft-delete model and its outgoing relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDeclaration {
    pub label: String,
    #[serde(default)]
    pub relations: Vec<RelationDeclaration>,
}

/// Top-level settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite file. `None` opens an in-memory database.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_level_owned")]
    pub log_level: String,
    /// Absolute directory for rolling log files. `None` disables file logs.
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelDeclaration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_level_owned(),
            log_dir: None,
            models: Vec::new(),
        }
    }
}

fn default_level_owned() -> String {
    default_log_level().to_string()
}

/// Settings loading and conversion errors.
#[derive(Debug)]
pub enum SettingsError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    InvalidLogLevel(LoggingError),
    Registry(RegistryError),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read settings `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid settings document: {err}"),
            Self::InvalidLogLevel(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "invalid model declarations: {err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidLogLevel(err) => Some(err),
            Self::Registry(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<RegistryError> for SettingsError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl Settings {
    /// Parses settings from a JSON document.
    pub fn from_json_str(document: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = serde_json::from_str(document)?;
        settings.log_level = normalize_level(&settings.log_level)
            .map_err(SettingsError::InvalidLogLevel)?
            .to_string();
        Ok(settings)
    }

    /// Reads and parses a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_json_str(&document)?;

        if let (Some(db_path), Some(base)) = (settings.database_path.as_ref(), path.parent()) {
            if db_path.is_relative() {
                settings.database_path = Some(base.join(db_path));
            }
        }
        Ok(settings)
    }

    /// Builds the validated registry from `models`.
    pub fn model_registry(&self) -> Result<ModelRegistry, SettingsError> {
        let mut builder = ModelRegistry::builder();
        for model in &self.models {
            builder = builder.model(model.label.as_str());
        }
        for model in &self.models {
            for relation in &model.relations {
                builder = builder.relation(
                    model.label.as_str(),
                    relation.related.as_str(),
                    relation.foreign_key.as_str(),
                    relation.on_delete,
                );
            }
        }
        Ok(builder.build()?)
    }

    /// Opens the configured database with migrations applied.
    pub fn open_database(&self) -> DbResult<Connection> {
        match &self.database_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Settings, SettingsError};
    use crate::model::registry::OnDelete;

    #[test]
    fn defaults_apply_to_empty_document() {
        let settings = Settings::from_json_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.model_registry().unwrap().is_empty());
    }

    #[test]
    fn parses_models_and_relations() {
        let settings = Settings::from_json_str(
            r#"{
                "log_level": "WARNING",
                "models": [
                    {"label": "blog.Post", "relations": [
                        {"related": "blog.Comment", "foreign_key": "post"},
                        {"related": "blog.Tag", "foreign_key": "post", "on_delete": "protect"}
                    ]},
                    {"label": "blog.Comment"},
                    {"label": "blog.Tag"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.models[0].relations[0].on_delete, OnDelete::Cascade);
        let registry = settings.model_registry().unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.cascade_edges("blog.Post").len(), 1);
    }

    #[test]
    fn rejects_unknown_log_level_and_bad_models() {
        let err = Settings::from_json_str(r#"{"log_level": "loud"}"#).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidLogLevel(_)));

        let settings = Settings::from_json_str(
            r#"{"models": [{"label": "blog.Post", "relations": [
                {"related": "blog.Missing", "foreign_key": "post"}
            ]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            settings.model_registry(),
            Err(SettingsError::Registry(_))
        ));
    }
}

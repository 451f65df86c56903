//! Configuration management for the schema builder
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-builder.toml)
//! - The user config dir (e.g. ~/.config/schema-builder/schema-builder.toml)
//! - Environment variables (SCHEMA_BUILDER__*)
//!
//! ## Example config file (schema-builder.toml):
//! ```toml
//! [snapshot]
//! path = "./schema.json"
//!
//! [export]
//! output_format = "pretty"
//!
//! [check]
//! fail_on_warnings = false
//!
//! [reserved]
//! models = ["boolean", "date"]
//! attributes = ["id", "createdAt", "updatedAt"]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::snapshot::ReservedNames;

/// Main configuration for the schema builder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Where the starting snapshot comes from
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Output settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Consistency check settings
    #[serde(default)]
    pub check: CheckConfig,

    /// Names reserved on top of the snapshot's own list
    #[serde(default)]
    pub reserved: ReservedConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Snapshot used when a command does not name one
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn render<T: Serialize>(self, value: &T) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Treat warnings (e.g. unpaired cross-entity relations) as failures
    #[serde(default)]
    pub fail_on_warnings: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservedConfig {
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl From<&ReservedConfig> for ReservedNames {
    fn from(config: &ReservedConfig) -> Self {
        ReservedNames {
            models: config.models.clone(),
            attributes: config.attributes.clone(),
        }
    }
}

impl BuilderConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding `config_path` (required) on top of the
    /// default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in [
            "schema-builder.toml",
            ".schema-builder.toml",
            "config/schema-builder.toml",
        ] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "familiar", "schema-builder") {
            let user_config = dirs.config_dir().join("schema-builder.toml");
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_BUILDER")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn reserved_names(&self) -> ReservedNames {
        ReservedNames::from(&self.reserved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuilderConfig::default();
        assert!(config.snapshot.path.is_none());
        assert_eq!(config.export.output_format, OutputFormat::Pretty);
        assert!(!config.check.fail_on_warnings);
        assert_eq!(config.reserved_names(), ReservedNames::default());
    }

    #[test]
    fn test_serialize_config() {
        let config = BuilderConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[export]"));
        assert!(toml_str.contains("output_format = \"pretty\""));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");

        let mut config = BuilderConfig::default();
        config.export.output_format = OutputFormat::Compact;
        config.check.fail_on_warnings = true;
        config.reserved.attributes = vec!["locale".to_string()];
        config.save(&path).unwrap();

        let loaded = BuilderConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.export.output_format, OutputFormat::Compact);
        assert!(loaded.check.fail_on_warnings);
        assert!(loaded.reserved_names().is_reserved_attribute("Locale"));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(BuilderConfig::load_from(path.to_str()).is_err());
    }

    #[test]
    fn test_render_formats() {
        let value = serde_json::json!({ "a": 1 });
        assert_eq!(OutputFormat::Compact.render(&value).unwrap(), "{\"a\":1}");
        assert!(OutputFormat::Pretty.render(&value).unwrap().contains('\n'));
    }
}

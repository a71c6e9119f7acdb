//! Engine configuration
//!
//! Controls where templates are looked up and how their files are named.
//! Can be built in code or loaded from a TOML file:
//!
//! ```toml
//! template_paths = ["templates", "/usr/share/composer/templates"]
//! extension = "tpl"
//! manifest = "setup.toml"
//!
//! [options]
//! format = "html"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use toml::Table;

use crate::options::Options;

/// Default extension of template files backing name-like sections
pub const DEFAULT_EXTENSION: &str = "tpl";

/// Default name of the per-definition extension manifest
pub const DEFAULT_MANIFEST: &str = "setup.toml";

/// Errors that can occur when loading an engine configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration for a template engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Template roots, searched in order
    pub template_paths: Vec<PathBuf>,
    /// Extension of section template files (without the dot)
    pub extension: String,
    /// Filename of the optional per-definition manifest
    pub manifest: String,
    /// Options applied beneath the options of every top-level render
    pub options: Options,
}

#[derive(Deserialize)]
struct TomlConfig {
    #[serde(default)]
    template_paths: Vec<PathBuf>,
    extension: Option<String>,
    manifest: Option<String>,
    options: Option<Table>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_paths: Vec::new(),
            extension: DEFAULT_EXTENSION.to_string(),
            manifest: DEFAULT_MANIFEST.to_string(),
            options: Options::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    ///
    /// Relative template paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.template_paths = config
                .template_paths
                .into_iter()
                .map(|p| if p.is_relative() { base.join(p) } else { p })
                .collect();
        }
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        Ok(Self {
            template_paths: parsed.template_paths,
            extension: parsed.extension.unwrap_or(defaults.extension),
            manifest: parsed.manifest.unwrap_or(defaults.manifest),
            options: parsed.options.map(Options::from_table).unwrap_or_default(),
        })
    }

    /// Append a template root
    pub fn with_template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_paths.push(path.into());
        self
    }

    /// Set the template file extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the manifest filename
    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    /// Set the default render options
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Filename of the template file backing `section`
    pub fn file_for(&self, section: &str) -> String {
        format!("{}.{}", section, self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.template_paths.is_empty());
        assert_eq!(config.extension, "tpl");
        assert_eq!(config.manifest, "setup.toml");
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new()
            .with_template_path("a")
            .with_template_path("b")
            .with_extension("erb")
            .with_manifest("template.toml");

        assert_eq!(config.template_paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(config.file_for("header"), "header.erb");
        assert_eq!(config.manifest, "template.toml");
    }

    #[test]
    fn test_parse_toml() {
        let config = EngineConfig::from_str(
            r#"
template_paths = ["templates"]
extension = "txt"

[options]
format = "text"
"#,
        )
        .expect("Should parse");
        assert_eq!(config.template_paths, vec![PathBuf::from("templates")]);
        assert_eq!(config.extension, "txt");
        assert_eq!(config.manifest, DEFAULT_MANIFEST);
        assert_eq!(config.options.get_str("format"), Some("text"));
    }

    #[test]
    fn test_from_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composer.toml");
        std::fs::write(&path, "template_paths = [\"templates\", \"/abs\"]\n").unwrap();

        let config = EngineConfig::from_file(&path).expect("Should load");
        assert_eq!(config.template_paths[0], dir.path().join("templates"));
        assert_eq!(config.template_paths[1], PathBuf::from("/abs"));
    }

    #[test]
    fn test_invalid_toml_error() {
        let result = EngineConfig::from_str("this is not valid toml {{{{");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}

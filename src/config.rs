//! Configuration for the generator CLI
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (bridgegen.toml)
//! - Environment variables (BRIDGEGEN_*)
//!
//! ## Example config file (bridgegen.toml):
//! ```toml
//! [package]
//! version = "4.2.0"
//!
//! [output]
//! format = "pretty"
//! include_fingerprint = true
//!
//! [validation]
//! fail_on_findings = false
//! extra_types_file = "extra-types.json"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Package settings
    #[serde(default)]
    pub package: PackageConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Package configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Overrides the version reported by the provider tree
    #[serde(default)]
    pub version: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub format: OutputFormat,

    /// Print the spec fingerprint after generation
    #[serde(default = "default_true")]
    pub include_fingerprint: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Treat name-check findings as a failed run
    #[serde(default)]
    pub fail_on_findings: bool,

    /// JSON file of externally supplied object types (token -> spec)
    #[serde(default)]
    pub extra_types_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pretty,
            include_fingerprint: true,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            fail_on_findings: false,
            extra_types_file: None,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["bridgegen.toml", ".bridgegen.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "bridgegen", "bridgegen") {
            let xdg_config = config_dir.config_dir().join("bridgegen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("BRIDGEGEN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.output.format, OutputFormat::Pretty);
        assert!(config.output.include_fingerprint);
        assert!(!config.validation.fail_on_findings);
    }

    #[test]
    fn test_serialize_config() {
        let config = GeneratorConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[validation]"));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = GeneratorConfig::default();
        config.package.version = Some("1.0.0".to_string());
        config.validation.fail_on_findings = true;
        let encoded = toml::to_string_pretty(&config).unwrap();
        let back: GeneratorConfig = toml::from_str(&encoded).unwrap();
        assert_eq!(back.package.version.as_deref(), Some("1.0.0"));
        assert!(back.validation.fail_on_findings);
    }
}

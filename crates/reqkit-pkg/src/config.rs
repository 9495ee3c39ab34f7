//! Optional project configuration (`reqkit.toml`).
//!
//! ```toml
//! manifest = "requirements.txt"
//!
//! [check]
//! require-pins = false
//! allow-unpinned = ["pip"]
//!
//! [setup]
//! venv-dir = ".venv"
//! python = "python3.11"
//! ```

use crate::layout::{CONFIG_FILE, MANIFEST_FILE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid virtual environment directory '{0}': {1}")]
    InvalidVenvDir(String, &'static str),
}

/// The complete `reqkit.toml` file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Manifest file, relative to the directory holding the config.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Settings for `reqkit check`.
    #[serde(default)]
    pub check: CheckConfig,

    /// Settings for generated setup instructions.
    #[serde(default)]
    pub setup: SetupConfig,
}

/// Settings for manifest checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CheckConfig {
    /// Report requirements that carry no version constraint as errors.
    #[serde(default)]
    pub require_pins: bool,

    /// Packages exempt from `require-pins`.
    #[serde(default)]
    pub allow_unpinned: Vec<String>,
}

/// Settings for virtual environment setup instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SetupConfig {
    /// Directory of the virtual environment.
    #[serde(default = "default_venv_dir")]
    pub venv_dir: String,

    /// Interpreter used to create the environment. Defaults to `py` on
    /// Windows and `python3` elsewhere.
    #[serde(default)]
    pub python: Option<String>,
}

fn default_manifest() -> String {
    MANIFEST_FILE.to_string()
}

fn default_venv_dir() -> String {
    String::from(".venv")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            check: CheckConfig::default(),
            setup: SetupConfig::default(),
        }
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            venv_dir: default_venv_dir(),
            python: None,
        }
    }
}

impl Config {
    /// Load `reqkit.toml` from a directory, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading config");
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or has unknown fields.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let venv_dir = &self.setup.venv_dir;
        if venv_dir.trim().is_empty() {
            return Err(ConfigError::InvalidVenvDir(
                venv_dir.clone(),
                "directory cannot be empty",
            ));
        }
        if venv_dir.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidVenvDir(
                venv_dir.clone(),
                "directory cannot contain whitespace",
            ));
        }
        Ok(())
    }

    /// Serialize the configuration to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl CheckConfig {
    /// Returns true if the package may appear without a version constraint.
    #[must_use]
    pub fn allows_unpinned(&self, name: &crate::PackageName) -> bool {
        !self.require_pins || self.allow_unpinned.iter().any(|allowed| name.matches(allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PackageName;
    use tempfile::TempDir;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.manifest, "requirements.txt");
        assert_eq!(config.setup.venv_dir, ".venv");
        assert!(!config.check.require_pins);
    }

    #[test]
    fn parse_full_config() {
        let config = Config::parse(
            r#"
manifest = "requirements/base.txt"

[check]
require-pins = true
allow-unpinned = ["pip", "setuptools"]

[setup]
venv-dir = "env"
python = "python3.11"
"#,
        )
        .unwrap();
        assert_eq!(config.manifest, "requirements/base.txt");
        assert!(config.check.require_pins);
        assert_eq!(config.check.allow_unpinned.len(), 2);
        assert_eq!(config.setup.venv_dir, "env");
        assert_eq!(config.setup.python.as_deref(), Some("python3.11"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = Config::parse("[check]\nrequire_pins = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_venv_dir() {
        let err = Config::parse("[setup]\nvenv-dir = \"my env\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVenvDir(..)));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_from_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[setup]\nvenv-dir = \"env\"\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.setup.venv_dir, "env");
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let mut config = Config::default();
        config.check.allow_unpinned.push("pip".into());
        let text = config.to_toml_string().unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }

    #[test]
    fn allow_unpinned_matches_normalized_names() {
        let check = CheckConfig {
            require_pins: true,
            allow_unpinned: vec!["Setup_Tools".into()],
        };
        assert!(check.allows_unpinned(&PackageName::new("setup-tools").unwrap()));
        assert!(!check.allows_unpinned(&PackageName::new("numpy").unwrap()));
        assert!(CheckConfig::default().allows_unpinned(&PackageName::new("numpy").unwrap()));
    }
}

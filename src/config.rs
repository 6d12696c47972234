//! Configuration System
//!
//! Layered configuration for tree generation and logging. Sources, lowest
//! precedence first: built-in defaults, the global file
//! (`$XDG_CONFIG_HOME/dmerk/config.toml`), the workspace file
//! (`./.dmerk.toml`), then `DMERK__SECTION__KEY` environment variables.
//! Command-line flags are applied on top by the CLI.

use crate::logging::LoggingConfig;
use crate::tree::builder::ErrorPolicy;
use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod sources;

pub use sources::global_file::global_config_path;
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmerkConfig {
    /// Tree generation settings
    pub generate: GenerateConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Tree generation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// What to do when an entry cannot be read
    pub error_policy: ErrorPolicy,

    /// Maximum concurrent file hashes (defaults to available parallelism)
    pub jobs: Option<usize>,

    /// Where generated trees are saved (defaults to the current directory)
    pub output_dir: Option<PathBuf>,
}

impl GenerateConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.jobs == Some(0) {
            return Err("jobs must be at least 1".to_string());
        }
        if let Some(dir) = &self.output_dir {
            if dir.as_os_str().is_empty() {
                return Err("output_dir cannot be empty".to_string());
            }
        }
        Ok(())
    }

    /// Output directory, resolved against `cwd` when unset or relative.
    pub fn output_dir_in(&self, cwd: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Generate(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Generate(msg) => write!(f, "generate: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DmerkConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.generate.validate() {
            errors.push(ValidationError::Generate(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads [`DmerkConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, global file, workspace file and environment.
    pub fn load(workspace_root: &Path) -> Result<DmerkConfig, ConfigError> {
        Self::build(global_config_path(), Some(workspace_root), None)
    }

    /// Load defaults, the given file and environment; the global and
    /// workspace files are skipped.
    pub fn load_from_file(path: &Path) -> Result<DmerkConfig, ConfigError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::Message(format!("Non UTF-8 config path {:?}", path)))?;
        Config::builder()
            .add_source(File::new(path_str, FileFormat::Toml).required(true))
            .add_source(Self::environment(None))
            .build()?
            .try_deserialize()
    }

    fn environment(source: Option<Map<String, String>>) -> Environment {
        Environment::with_prefix("DMERK")
            .separator("__")
            .try_parsing(true)
            .source(source)
    }

    fn build(
        global: Option<PathBuf>,
        workspace_root: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<DmerkConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(global) = global {
            builder = sources::global_file::add_to_builder(builder, &global)?;
        }
        if let Some(root) = workspace_root {
            builder = sources::workspace_file::add_to_builder(builder, root)?;
        }
        builder
            .add_source(Self::environment(env))
            .build()?
            .try_deserialize()
    }
}

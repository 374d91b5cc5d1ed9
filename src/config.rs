//! Hook configuration: file loading and environment reconciliation.
//!
//! The patch hook takes every collaborator as an explicit value; this module
//! produces those values from an optional JSON config file plus the build
//! environment, and refuses loudly when the two disagree about the PHP version
//! being built.

use crate::error::ConfigError;
use crate::models::{MissingPatternPolicy, PatchStrategy, PhpVersion, VersionSource};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable the build pipeline sets to the compact PHP version,
/// e.g. `82` for a PHP 8.2 build.
pub const SHORT_VERSION_ENV: &str = "SPC_PHP_VERSION_SHORT";

/// On-disk hook settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookConfig {
    /// How the rewrite is expressed in the patched source.
    #[serde(default)]
    pub strategy: PatchStrategy,
    /// Explicit PHP version line, `"8.2"` or compact `"82"`.
    #[serde(default)]
    pub php_version: Option<String>,
    /// What to do when an expected pattern is absent from the target.
    #[serde(default)]
    pub on_missing_pattern: MissingPatternPolicy,
}

impl HookConfig {
    /// Resolve the version source for this configuration.
    ///
    /// Precedence: explicit config value, then the pipeline environment. When
    /// both are present they must agree; a mismatch means the checkout and the
    /// workflow matrix drifted apart and the build must not guess.
    pub fn version_source(&self, env_short: Option<&str>) -> Result<VersionSource, ConfigError> {
        let explicit = self
            .php_version
            .as_deref()
            .map(PhpVersion::parse_short)
            .transpose()
            .map_err(ConfigError::ValidationFailed)?;
        let ambient = env_short
            .map(PhpVersion::parse_short)
            .transpose()
            .map_err(ConfigError::ValidationFailed)?;

        let version = match (explicit, ambient) {
            (Some(configured), Some(env)) if configured != env => {
                return Err(ConfigError::ConflictDetected(format!(
                    "configured PHP version {} disagrees with {}={}",
                    configured,
                    SHORT_VERSION_ENV,
                    env.short()
                )));
            }
            (Some(configured), _) => Some(configured),
            (None, env) => env,
        };

        match (self.strategy, version) {
            (_, Some(version)) => Ok(VersionSource::ShortVersion(version)),
            (PatchStrategy::InjectFunction, None) => Ok(VersionSource::CompileTimeMacros),
            (PatchStrategy::RenameLiteralOnly, None) => Err(ConfigError::ValidationFailed(
                format!(
                    "rename-literal strategy needs a PHP version: set php_version or {}",
                    SHORT_VERSION_ENV
                ),
            )),
        }
    }
}

/// Load hook config from a JSON file.
pub fn load_config_from_file(path: &Path) -> Result<HookConfig, ConfigError> {
    // Validate the path first
    validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: HookConfig = serde_json::from_str(&content).map_err(ConfigError::InvalidJson)?;
    Ok(config)
}

/// Save hook config to a JSON file.
pub fn save_config_to_file(config: &HookConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }
    }

    let json_content = serde_json::to_string_pretty(config).map_err(ConfigError::InvalidJson)?;
    fs::write(path, json_content).map_err(ConfigError::IoError)?;
    Ok(())
}

/// Validate config path (.json extension required).
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "json" => Ok(()),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .json extension, got .{}",
            ext.to_string_lossy()
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .json extension".to_string(),
        )),
    }
}

//! Shared configuration loader for the sift toolchain.
//!
//! `defaults/sift.default.toml` is embedded into every binary so that docs
//! and runtime behavior stay in sync. Applications layer user-specific
//! files on top of those defaults via [`Loader`] before deserializing into
//! [`SiftConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/sift.default.toml");

/// Top-level configuration consumed by sift applications.
#[derive(Debug, Clone, Deserialize)]
pub struct SiftConfig {
    pub filter: FilterConfig,
    pub expand: ExpandConfig,
    pub paths: PathsConfig,
    pub limits: LimitsConfig,
    pub extract: ExtractSectionConfig,
}

/// Directive recognition knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    pub namespace: String,
    pub positional_prefix: String,
    pub field_separator: String,
}

/// Variable token syntax and expansion policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpandConfig {
    pub prefix: String,
    pub suffix: String,
    pub escape_prefix: String,
    pub escape_suffix: String,
    pub escape_prefix_strip: usize,
    pub escape_suffix_strip: usize,
    pub report_on_miss: bool,
    pub report_message: String,
    /// 0 disables the ceiling.
    pub max_passes: usize,
}

/// Library, search, and output locations.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub lib_path: String,
    pub include_paths: Vec<String>,
    pub output_dir: String,
    pub html_dir: String,
    pub latex_dir: String,
    pub path_joiner: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub not_found_tolerance: u32,
}

/// Script-extractor marker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractSectionConfig {
    pub begin_name: String,
    pub end_name: String,
    pub joiner: String,
    pub extension: String,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<SiftConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<SiftConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.filter.namespace, "sift_");
        assert_eq!(config.expand.prefix, "${");
        assert_eq!(config.expand.escape_prefix_strip, 1);
        assert_eq!(config.limits.not_found_tolerance, 0);
        assert_eq!(config.extract.extension, ".bash");
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("filter.namespace", "doc_")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.filter.namespace, "doc_");
    }

    #[test]
    fn escape_prefix_default_is_a_single_backslash_before_the_token() {
        let config = load_defaults().unwrap();
        assert_eq!(config.expand.escape_prefix, "\\${");
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime configuration.
//!
//! - **Constants**: cache and recursion defaults.
//! - **[`RuntimeConfig`]**: per-runtime knobs, built from defaults, the
//!   `DYNRT_*` environment variables, or a YAML file (feature `loaders`).
//!   A running [`Runtime`](crate::Runtime) holds its config in an
//!   `ArcSwap` so it can be replaced without locking readers.
//!
//! # Example
//!
//! ```rust
//! use dynrt::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::default()
//!     .with_zero_fill(true)
//!     .with_name_cache_capacity(1024);
//! assert!(config.zero_fill);
//! ```

use std::fmt;

/// Default capacity of the resolved-name memo.
pub const DEFAULT_NAME_CACHE_CAPACITY: usize = 256;

/// Default bound on nested resolution (generic arguments, member types).
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 64;

/// Largest accepted resolution depth; resolution recurses once per level.
pub const MAX_RESOLUTION_DEPTH_LIMIT: usize = 1024;

pub const ENV_NAME_CACHE_CAPACITY: &str = "DYNRT_NAME_CACHE_CAPACITY";
pub const ENV_MAX_RESOLUTION_DEPTH: &str = "DYNRT_MAX_RESOLUTION_DEPTH";
pub const ENV_ZERO_FILL: &str = "DYNRT_ZERO_FILL";
pub const ENV_CHECKED_EQUALITY: &str = "DYNRT_CHECKED_EQUALITY";

/// Per-runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "loaders", derive(serde::Deserialize), serde(default))]
pub struct RuntimeConfig {
    /// Entries in the name memo; 0 disables it.
    pub name_cache_capacity: usize,

    /// Deepest nesting the resolver follows before giving up.
    pub max_resolution_depth: usize,

    /// Zero new instances instead of leaving them uninitialized.
    pub zero_fill: bool,

    /// Validate tags and tables in `Runtime::equal` (on in debug builds).
    pub checked_equality: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name_cache_capacity: DEFAULT_NAME_CACHE_CAPACITY,
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            zero_fill: false,
            checked_equality: cfg!(debug_assertions),
        }
    }
}

fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse().ok()
}

fn clamp_depth(depth: usize) -> usize {
    if depth > MAX_RESOLUTION_DEPTH_LIMIT {
        log::warn!(
            "[config] max_resolution_depth {} clamped to {}",
            depth,
            MAX_RESOLUTION_DEPTH_LIMIT
        );
    }
    depth.min(MAX_RESOLUTION_DEPTH_LIMIT)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by any `DYNRT_*` variables that parse.
    pub fn from_env() -> Self {
        let config = Self::from_vars(|name| std::env::var(name).ok());
        log::debug!("[config] from environment: {:?}", config);
        config
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let usize_var = |name: &str| var(name).as_deref().and_then(parse_usize);
        let bool_var = |name: &str| var(name).as_deref().and_then(parse_bool);
        Self {
            name_cache_capacity: usize_var(ENV_NAME_CACHE_CAPACITY)
                .unwrap_or(defaults.name_cache_capacity),
            max_resolution_depth: clamp_depth(
                usize_var(ENV_MAX_RESOLUTION_DEPTH).unwrap_or(defaults.max_resolution_depth),
            ),
            zero_fill: bool_var(ENV_ZERO_FILL).unwrap_or(defaults.zero_fill),
            checked_equality: bool_var(ENV_CHECKED_EQUALITY).unwrap_or(defaults.checked_equality),
        }
    }

    pub fn with_name_cache_capacity(mut self, capacity: usize) -> Self {
        self.name_cache_capacity = capacity;
        self
    }

    /// Clamped to [`MAX_RESOLUTION_DEPTH_LIMIT`].
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = clamp_depth(depth);
        self
    }

    /// Resolution depth the resolver applies, whatever was assigned.
    pub fn effective_max_resolution_depth(&self) -> usize {
        clamp_depth(self.max_resolution_depth)
    }

    pub fn with_zero_fill(mut self, zero_fill: bool) -> Self {
        self.zero_fill = zero_fill;
        self
    }

    pub fn with_checked_equality(mut self, checked: bool) -> Self {
        self.checked_equality = checked;
        self
    }

    /// Parse a YAML document; missing keys keep their defaults.
    #[cfg(feature = "loaders")]
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.max_resolution_depth = clamp_depth(config.max_resolution_depth);
        Ok(config)
    }

    /// Load a YAML configuration file.
    #[cfg(feature = "loaders")]
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }
}

/// Configuration loading failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration file could not be read.
    FileNotFound(String),
    /// Configuration content is malformed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(msg) => write!(f, "Configuration file not found: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.name_cache_capacity, DEFAULT_NAME_CACHE_CAPACITY);
        assert_eq!(config.max_resolution_depth, DEFAULT_MAX_RESOLUTION_DEPTH);
        assert!(!config.zero_fill);
        assert_eq!(config.checked_equality, cfg!(debug_assertions));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_builder_setters() {
        let config = RuntimeConfig::new()
            .with_name_cache_capacity(0)
            .with_max_resolution_depth(8)
            .with_zero_fill(true)
            .with_checked_equality(true);
        assert_eq!(config.name_cache_capacity, 0);
        assert_eq!(config.max_resolution_depth, 8);
        assert!(config.zero_fill && config.checked_equality);
    }

    #[test]
    fn test_resolution_depth_is_clamped() {
        let config = RuntimeConfig::from_vars(|name| match name {
            ENV_MAX_RESOLUTION_DEPTH => Some("1000000".to_string()),
            ENV_ZERO_FILL => Some("on".to_string()),
            _ => None,
        });
        assert_eq!(config.max_resolution_depth, MAX_RESOLUTION_DEPTH_LIMIT);
        assert!(config.zero_fill);
        assert_eq!(config.name_cache_capacity, DEFAULT_NAME_CACHE_CAPACITY);

        let config = RuntimeConfig::new().with_max_resolution_depth(usize::MAX);
        assert_eq!(config.max_resolution_depth, MAX_RESOLUTION_DEPTH_LIMIT);

        let mut config = RuntimeConfig::new();
        config.max_resolution_depth = usize::MAX;
        assert_eq!(
            config.effective_max_resolution_depth(),
            MAX_RESOLUTION_DEPTH_LIMIT
        );
    }

    #[cfg(feature = "loaders")]
    #[test]
    fn test_from_yaml_partial() {
        let config = RuntimeConfig::from_yaml_str("zero_fill: true\nmax_resolution_depth: 16\n")
            .expect("parse");
        assert!(config.zero_fill);
        assert_eq!(config.max_resolution_depth, 16);
        assert_eq!(config.name_cache_capacity, DEFAULT_NAME_CACHE_CAPACITY);
    }

    #[cfg(feature = "loaders")]
    #[test]
    fn test_from_yaml_rejects_bad_types() {
        assert!(matches!(
            RuntimeConfig::from_yaml_str("zero_fill: [1, 2]"),
            Err(ConfigError::Parse(_))
        ));
    }
}

//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the store and the
//! sticky inputs. Nothing reads environment variables during request handling.
//!
//! Every option can be overridden with a `STICKY_UPLOADS_`-prefixed variable, for example
//! `STICKY_UPLOADS_STICKINESS=7200`. Blank values fall back to the default; values that do
//! not parse are rejected so a typo is caught at startup rather than silently ignored.

use crate::constants::{
    DEFAULT_TOKEN_FIELD, ENV_DIR, ENV_MAX_FILES_PER_USER, ENV_MAX_STICKY_FILES, ENV_STICKINESS,
    ENV_TOKEN_FIELD,
};
use crate::{StickyError, StickyResult};
use std::path::PathBuf;
use std::time::Duration;
use sticky_files::{
    default_dir, StickyConfig, DEFAULT_MAX_FILES_PER_USER, DEFAULT_MAX_STICKY_FILES,
    DEFAULT_STICKINESS_SECS,
};
use sticky_types::NonEmptyText;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    store: StickyConfig,
    token_field: NonEmptyText,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            store: StickyConfig::default(),
            token_field: default_token_field(),
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(store: StickyConfig, token_field: NonEmptyText) -> Self {
        Self { store, token_field }
    }

    /// Resolve configuration from the process environment.
    ///
    /// Call this once, at startup.
    pub fn from_env() -> StickyResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StickyResult<Self> {
        let dir = dir_from_env_value(lookup(ENV_DIR));
        let stickiness = u64_from_env_value(
            ENV_STICKINESS,
            lookup(ENV_STICKINESS),
            DEFAULT_STICKINESS_SECS,
        )?;
        let max_files_per_user = usize_from_env_value(
            ENV_MAX_FILES_PER_USER,
            lookup(ENV_MAX_FILES_PER_USER),
            DEFAULT_MAX_FILES_PER_USER,
        )?;
        let max_sticky_files = usize_from_env_value(
            ENV_MAX_STICKY_FILES,
            lookup(ENV_MAX_STICKY_FILES),
            DEFAULT_MAX_STICKY_FILES,
        )?;
        let token_field = token_field_from_env_value(lookup(ENV_TOKEN_FIELD));

        let store = StickyConfig::new(dir)
            .with_stickiness(Duration::from_secs(stickiness))
            .with_max_files_per_user(max_files_per_user)
            .with_max_sticky_files(max_sticky_files);

        Ok(Self::new(store, token_field))
    }

    pub fn store(&self) -> &StickyConfig {
        &self.store
    }

    /// Name of the submitted field whose value partitions the store by user.
    pub fn token_field(&self) -> &str {
        self.token_field.as_str()
    }
}

fn default_token_field() -> NonEmptyText {
    NonEmptyText::new(DEFAULT_TOKEN_FIELD).expect("DEFAULT_TOKEN_FIELD is non-empty")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the storage root from an optional value.
///
/// If `value` is `None` or blank, returns `<system temp dir>/.sticky_files`.
pub fn dir_from_env_value(value: Option<String>) -> PathBuf {
    non_blank(value).map(PathBuf::from).unwrap_or_else(default_dir)
}

/// Parse the anti-forgery field name from an optional value.
pub fn token_field_from_env_value(value: Option<String>) -> NonEmptyText {
    value
        .and_then(|v| NonEmptyText::new(v).ok())
        .unwrap_or_else(default_token_field)
}

fn u64_from_env_value(name: &str, value: Option<String>, default: u64) -> StickyResult<u64> {
    match non_blank(value) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e| {
            StickyError::InvalidConfig(format!("{} must be a whole number, got '{}': {}", name, v, e))
        }),
    }
}

fn usize_from_env_value(name: &str, value: Option<String>, default: usize) -> StickyResult<usize> {
    match non_blank(value) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e| {
            StickyError::InvalidConfig(format!("{} must be a whole number, got '{}': {}", name, v, e))
        }),
    }
}

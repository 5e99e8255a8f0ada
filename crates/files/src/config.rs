//! Store configuration.

use crate::constants::{
    DEFAULT_DIR_NAME, DEFAULT_MAX_FILES_PER_USER, DEFAULT_MAX_STICKY_FILES,
    DEFAULT_STICKINESS_SECS,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Limits and location for a [`crate::StickyStore`].
///
/// Resolve this once at startup and hand it to the store; nothing in this crate reads the
/// environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StickyConfig {
    dir: PathBuf,
    stickiness: Duration,
    max_files_per_user: usize,
    max_sticky_files: usize,
}

impl Default for StickyConfig {
    fn default() -> Self {
        Self::new(default_dir())
    }
}

impl StickyConfig {
    /// Creates a configuration rooted at `dir` with default limits.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stickiness: Duration::from_secs(DEFAULT_STICKINESS_SECS),
            max_files_per_user: DEFAULT_MAX_FILES_PER_USER,
            max_sticky_files: DEFAULT_MAX_STICKY_FILES,
        }
    }

    pub fn with_stickiness(mut self, stickiness: Duration) -> Self {
        self.stickiness = stickiness;
        self
    }

    pub fn with_max_files_per_user(mut self, max: usize) -> Self {
        self.max_files_per_user = max;
        self
    }

    pub fn with_max_sticky_files(mut self, max: usize) -> Self {
        self.max_sticky_files = max;
        self
    }

    /// Storage root. May not exist yet.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// How long a staged file is guaranteed to survive the age-based sweep.
    pub fn stickiness(&self) -> Duration {
        self.stickiness
    }

    pub fn max_files_per_user(&self) -> usize {
        self.max_files_per_user
    }

    pub fn max_sticky_files(&self) -> usize {
        self.max_sticky_files
    }
}

/// `<system temp dir>/.sticky_files`
pub fn default_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_DIR_NAME)
}

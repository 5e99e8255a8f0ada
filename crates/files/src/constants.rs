//! Defaults for the sticky store.

/// Directory created under the system temp dir when no storage root is configured.
pub const DEFAULT_DIR_NAME: &str = ".sticky_files";

/// Seconds a session stays ineligible for eviction.
pub const DEFAULT_STICKINESS_SECS: u64 = 3600;

/// File count above which a user's whole namespace is dropped.
pub const DEFAULT_MAX_FILES_PER_USER: usize = 10;

/// File count above which the whole store is dropped.
pub const DEFAULT_MAX_STICKY_FILES: usize = 1000;

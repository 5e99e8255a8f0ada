//! Constants used throughout the sticky core crate.
//!
//! Field names and environment variable names live here so the wire contract and the
//! configuration surface are defined in one place.

/// Storage root override.
pub const ENV_DIR: &str = "STICKY_UPLOADS_DIR";

/// Seconds a staged file is kept before it may be evicted.
pub const ENV_STICKINESS: &str = "STICKY_UPLOADS_STICKINESS";

/// Per-user file ceiling.
pub const ENV_MAX_FILES_PER_USER: &str = "STICKY_UPLOADS_MAX_FILES_PER_USER";

/// Global file ceiling.
pub const ENV_MAX_STICKY_FILES: &str = "STICKY_UPLOADS_MAX_STICKY_FILES";

/// Name of the submitted field carrying the anti-forgery token.
pub const ENV_TOKEN_FIELD: &str = "STICKY_UPLOADS_TOKEN_FIELD";

/// Anti-forgery field used when none is configured.
pub const DEFAULT_TOKEN_FIELD: &str = "csrf_token";

/// Suffix of the hidden input carrying the staged file name (`<field>_sticky_file`).
pub const STICKY_FILE_SUFFIX: &str = "sticky_file";

/// Suffix of the hidden input carrying the session id (`<field>_sticky_session_id`).
pub const STICKY_SESSION_SUFFIX: &str = "sticky_session_id";

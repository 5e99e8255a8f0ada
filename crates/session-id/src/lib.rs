//! Sticky session identifiers.
//!
//! Every upload attempt is staged under its own session directory. The directory name is the
//! time the upload was received, as UNIX seconds with exactly six fractional digits:
//!
//! ```text
//! 1767225600.123456
//! ```
//!
//! Because the identifier *is* the creation time, the eviction sweep can compute the age of a
//! staged file from its directory name alone, without touching file metadata.
//!
//! This crate provides:
//! - [`StickySessionId`]: a parsed identifier in canonical form.
//! - [`SessionIdGenerator`]: hands out identifiers that are strictly increasing within a
//!   process, so two uploads in the same microsecond never share a directory.
//! - [`timestamp_secs`]: the lenient numeric reading used when sweeping directories that may
//!   have been created by something else.

mod service;

pub use service::{timestamp_secs, SessionIdGenerator, StickySessionId};

/// Error type for session id operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionIdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for session id operations.
pub type SessionIdResult<T> = Result<T, SessionIdError>;

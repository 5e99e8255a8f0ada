//! Sticky File Storage
//!
//! A small staging cache that keeps uploaded files on disk between form submissions, so a
//! user whose form failed validation does not have to pick the same file again.
//!
//! ## Design Principles
//!
//! - A staged file is addressed by (user token, session id, file name) and nothing else
//! - Every upload attempt gets a fresh, time-derived session id, so staged files never
//!   overwrite each other within the stickiness window
//! - Writes are atomic (temp file + rename)
//! - Storage is bounded by an eviction sweep that runs before every write
//! - A missing or bad reference is never an error, only [`LoadOutcome::NotFound`]
//!
//! ## Storage Model
//!
//! ```text
//! <dir>/
//! └── <user_token>/
//!     └── 1767225600.123456/
//!         └── photo.jpg
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use sticky_files::{LoadOutcome, StickyConfig, StickyKey, StickyStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StickyStore::new(StickyConfig::default());
//! let key = StickyKey::new("csrf-token", store.next_session_id(), "photo.jpg")?;
//!
//! store.save(&key, b"...")?;
//! assert!(matches!(store.load(&key), LoadOutcome::Found(_)));
//! # Ok(())
//! # }
//! ```

mod config;
mod constants;
mod key;
mod store;

pub use config::{default_dir, StickyConfig};
pub use constants::{
    DEFAULT_DIR_NAME, DEFAULT_MAX_FILES_PER_USER, DEFAULT_MAX_STICKY_FILES,
    DEFAULT_STICKINESS_SECS,
};
pub use key::StickyKey;
pub use store::{EvictionReport, LoadOutcome, StagedFile, StickyStore, StoreStats};
pub use sticky_session_id::StickySessionId;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// A key component is missing, empty, or not a single path segment
    #[error("Invalid sticky key: {0}")]
    InvalidKey(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! The storage seam used by sticky inputs.

use std::path::PathBuf;
use std::sync::Arc;
use sticky_files::{FilesError, LoadOutcome, StickyKey, StickySessionId, StickyStore};

/// Somewhere to stage uploads between submissions.
///
/// [`StickyStore`] is the real implementation. The trait exists so inputs can be driven
/// against other stores, and so tests can observe exactly which calls an input makes.
pub trait StagingStore {
    /// A session id not yet used by any upload.
    fn next_session_id(&self) -> StickySessionId;

    /// Stages `bytes` under `key`.
    fn save(&self, key: &StickyKey, bytes: &[u8]) -> Result<PathBuf, FilesError>;

    /// Looks up a staged file from raw identifiers.
    fn load(
        &self,
        user_token: Option<&str>,
        session_id: Option<&str>,
        file_name: Option<&str>,
    ) -> LoadOutcome;
}

impl StagingStore for StickyStore {
    fn next_session_id(&self) -> StickySessionId {
        StickyStore::next_session_id(self)
    }

    fn save(&self, key: &StickyKey, bytes: &[u8]) -> Result<PathBuf, FilesError> {
        StickyStore::save(self, key, bytes)
    }

    fn load(
        &self,
        user_token: Option<&str>,
        session_id: Option<&str>,
        file_name: Option<&str>,
    ) -> LoadOutcome {
        self.load_parts(user_token, session_id, file_name)
    }
}

impl<T: StagingStore + ?Sized> StagingStore for &T {
    fn next_session_id(&self) -> StickySessionId {
        (**self).next_session_id()
    }

    fn save(&self, key: &StickyKey, bytes: &[u8]) -> Result<PathBuf, FilesError> {
        (**self).save(key, bytes)
    }

    fn load(
        &self,
        user_token: Option<&str>,
        session_id: Option<&str>,
        file_name: Option<&str>,
    ) -> LoadOutcome {
        (**self).load(user_token, session_id, file_name)
    }
}

impl<T: StagingStore + ?Sized> StagingStore for Arc<T> {
    fn next_session_id(&self) -> StickySessionId {
        (**self).next_session_id()
    }

    fn save(&self, key: &StickyKey, bytes: &[u8]) -> Result<PathBuf, FilesError> {
        (**self).save(key, bytes)
    }

    fn load(
        &self,
        user_token: Option<&str>,
        session_id: Option<&str>,
        file_name: Option<&str>,
    ) -> LoadOutcome {
        (**self).load(user_token, session_id, file_name)
    }
}

//! The three-part address of a staged file.

use crate::FilesError;
use std::path::{Path, PathBuf};
use sticky_session_id::StickySessionId;
use sticky_types::PathSegment;

/// Validated (user token, session id, file name) triple.
///
/// Every component is a single safe path segment, so the path a key maps to is always
/// `<root>/<user_token>/<session_id>/<file_name>` and never escapes the root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StickyKey {
    user_token: PathSegment,
    session_id: StickySessionId,
    file_name: PathSegment,
}

impl StickyKey {
    /// Builds a key for a freshly generated session id.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidKey`] if the user token or file name is empty or is not a
    /// single path segment.
    pub fn new(
        user_token: &str,
        session_id: StickySessionId,
        file_name: &str,
    ) -> Result<Self, FilesError> {
        let user_token = PathSegment::new(user_token)
            .map_err(|e| FilesError::InvalidKey(format!("user token: {}", e)))?;
        let file_name = PathSegment::new(file_name)
            .map_err(|e| FilesError::InvalidKey(format!("file name: {}", e)))?;

        Ok(Self {
            user_token,
            session_id,
            file_name,
        })
    }

    /// Builds a key from raw values, typically round-tripped through a client.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidKey`] if any component is missing, empty, or invalid,
    /// including a session id that is not in canonical form.
    pub fn from_parts(
        user_token: Option<&str>,
        session_id: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<Self, FilesError> {
        let (Some(user_token), Some(session_id), Some(file_name)) =
            (user_token, session_id, file_name)
        else {
            return Err(FilesError::InvalidKey(
                "missing data; cannot calculate path".into(),
            ));
        };

        let session_id = StickySessionId::parse(session_id)
            .map_err(|e| FilesError::InvalidKey(format!("session id: {}", e)))?;

        Self::new(user_token, session_id, file_name)
    }

    pub fn user_token(&self) -> &str {
        self.user_token.as_str()
    }

    pub fn session_id(&self) -> StickySessionId {
        self.session_id
    }

    pub fn file_name(&self) -> &str {
        self.file_name.as_str()
    }

    /// `<root>/<user_token>/<session_id>`
    pub fn session_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.user_token)
            .join(self.session_id.to_string())
    }

    /// `<root>/<user_token>/<session_id>/<file_name>`
    pub fn path(&self, root: &Path) -> PathBuf {
        self.session_dir(root).join(&self.file_name)
    }
}

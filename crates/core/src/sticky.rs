//! Sticky file inputs.
//!
//! A sticky input keeps an uploaded file alive across failed submissions of the same form.
//!
//! For a field named `F` the form carries two extra hidden inputs:
//!
//! | Input                  | Value                                  |
//! |------------------------|----------------------------------------|
//! | `F_sticky_file`        | name of the staged file                |
//! | `F_sticky_session_id`  | session id the file was staged under   |
//!
//! On submission:
//! - a fresh upload is staged under a new session id and used as the value;
//! - otherwise the hidden inputs are used to load the staged copy, which becomes the value as
//!   if it had been uploaded again;
//! - if that fails for any reason, the identifiers are dropped so the next render does not
//!   claim a file the server no longer has.

use crate::config::CoreConfig;
use crate::constants::{STICKY_FILE_SUFFIX, STICKY_SESSION_SUFFIX};
use crate::html::{escape, hidden_input};
use crate::staging::StagingStore;
use crate::submission::{FormSubmission, UploadedFile};
use crate::widget::{FileInput, ResolveValue, Widget};
use crate::StickyResult;
use sticky_files::{LoadOutcome, StickyKey};

/// A file input whose uploads survive failed submissions.
pub type StickyFileInput<S> = Widget<StickyUpload<S>>;

/// `<name>_<suffix>`
pub fn hidden_input_name(name: &str, suffix: &str) -> String {
    format!("{}_{}", name, suffix)
}

/// Strips any directory part a browser may have included in an upload's file name.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Value strategy that stages new uploads and recovers staged ones.
#[derive(Debug)]
pub struct StickyUpload<S> {
    store: S,
    token_field: String,
    user_token: Option<String>,
    sticky_session_id: Option<String>,
    sticky_file_name: Option<String>,
}

impl<S: StagingStore> StickyUpload<S> {
    /// `token_field` names the submitted field holding the anti-forgery token.
    pub fn new(store: S, token_field: impl Into<String>) -> Self {
        Self {
            store,
            token_field: token_field.into(),
            user_token: None,
            sticky_session_id: None,
            sticky_file_name: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn user_token(&self) -> Option<&str> {
        self.user_token.as_deref()
    }

    pub fn sticky_session_id(&self) -> Option<&str> {
        self.sticky_session_id.as_deref()
    }

    pub fn sticky_file_name(&self) -> Option<&str> {
        self.sticky_file_name.as_deref()
    }

    fn forget(&mut self) {
        self.sticky_session_id = None;
        self.sticky_file_name = None;
    }

    /// Keeps a copy of a fresh upload. Returns without staging if no valid key can be formed.
    fn stage(&mut self, upload: &UploadedFile) -> StickyResult<()> {
        let Some(user_token) = self.user_token.as_deref() else {
            tracing::warn!(
                token_field = %self.token_field,
                "submission has no user token; upload will not be sticky"
            );
            self.forget();
            return Ok(());
        };

        let file_name = base_name(upload.name());
        let session_id = self.store.next_session_id();
        let key = match StickyKey::new(user_token, session_id, file_name) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "upload cannot be staged; it will not be sticky");
                self.forget();
                return Ok(());
            }
        };

        self.store.save(&key, upload.bytes())?;
        self.sticky_file_name = Some(key.file_name().to_owned());
        self.sticky_session_id = Some(session_id.to_string());
        Ok(())
    }

    fn recover(&mut self, name: &str, submission: &FormSubmission) -> Option<UploadedFile> {
        self.sticky_file_name = submission
            .field(&hidden_input_name(name, STICKY_FILE_SUFFIX))
            .map(str::to_owned);
        self.sticky_session_id = submission
            .field(&hidden_input_name(name, STICKY_SESSION_SUFFIX))
            .map(str::to_owned);

        let outcome = self.store.load(
            self.user_token.as_deref(),
            self.sticky_session_id.as_deref(),
            self.sticky_file_name.as_deref(),
        );

        match outcome {
            LoadOutcome::Found(staged) => Some(UploadedFile::staged(staged)),
            LoadOutcome::NotFound => {
                self.forget();
                None
            }
        }
    }
}

impl<S: StagingStore> ResolveValue for StickyUpload<S> {
    fn resolve(
        &mut self,
        name: &str,
        submission: &FormSubmission,
    ) -> StickyResult<Option<UploadedFile>> {
        self.user_token = submission
            .field(&self.token_field)
            .filter(|token| !token.is_empty())
            .map(str::to_owned);

        match submission.upload(name) {
            Some(upload) => {
                self.stage(upload)?;
                Ok(Some(upload.clone()))
            }
            None => Ok(self.recover(name, submission)),
        }
    }

    fn prelude(&self, name: &str) -> String {
        let (Some(file_name), Some(session_id)) = (
            self.sticky_file_name.as_deref(),
            self.sticky_session_id.as_deref(),
        ) else {
            return String::new();
        };

        format!(
            "<span>You have already uploaded <strong>{}</strong>; leave this field blank if \
             you'd like to use that file.</span>{}{}",
            escape(file_name),
            hidden_input(&hidden_input_name(name, STICKY_FILE_SUFFIX), file_name),
            hidden_input(&hidden_input_name(name, STICKY_SESSION_SUFFIX), session_id),
        )
    }
}

impl<S: StagingStore> Widget<StickyUpload<S>> {
    /// A sticky file input backed by `store`.
    pub fn sticky(store: S, config: &CoreConfig) -> Self {
        Widget::new(
            FileInput::new(),
            StickyUpload::new(store, config.token_field()),
        )
    }
}

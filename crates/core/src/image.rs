//! Image-only file fields.
//!
//! [`ImageOnly`] wraps any value strategy and drops values whose bytes are not a recognised
//! image format. It applies equally to fresh uploads and to copies recovered from the sticky
//! store, so a non-image staged earlier through another field is never accepted here.

use crate::config::CoreConfig;
use crate::staging::StagingStore;
use crate::sticky::StickyUpload;
use crate::submission::{FormSubmission, UploadedFile};
use crate::widget::{FileInput, ResolveValue, Widget};
use crate::StickyResult;

/// A sticky file input that only accepts images.
pub type StickyImageInput<S> = Widget<ImageOnly<StickyUpload<S>>>;

/// Value strategy that accepts only images from `R`.
#[derive(Debug)]
pub struct ImageOnly<R> {
    inner: R,
    rejected: Option<String>,
}

impl<R: ResolveValue> ImageOnly<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            rejected: None,
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Name of the file turned away by the last resolve, if any.
    pub fn rejected(&self) -> Option<&str> {
        self.rejected.as_deref()
    }
}

impl<R: ResolveValue> ResolveValue for ImageOnly<R> {
    fn resolve(
        &mut self,
        name: &str,
        submission: &FormSubmission,
    ) -> StickyResult<Option<UploadedFile>> {
        self.rejected = None;

        match self.inner.resolve(name, submission)? {
            Some(file) if !file.is_image() => {
                tracing::debug!(field = name, file = file.name(), "rejecting non-image upload");
                self.rejected = Some(file.name().to_owned());
                Ok(None)
            }
            value => Ok(value),
        }
    }

    /// Nothing is offered for reuse once the file has been rejected.
    fn prelude(&self, name: &str) -> String {
        if self.rejected.is_some() {
            return String::new();
        }
        self.inner.prelude(name)
    }
}

impl<S: StagingStore> Widget<ImageOnly<StickyUpload<S>>> {
    /// A sticky file input backed by `store` that only accepts images.
    pub fn sticky_image(store: S, config: &CoreConfig) -> Self {
        Widget::new(
            FileInput::new().with_attr("accept", "image/*"),
            ImageOnly::new(StickyUpload::new(store, config.token_field())),
        )
    }
}

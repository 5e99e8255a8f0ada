//! File inputs built by composition.
//!
//! A [`Widget`] pairs a [`FileInput`], which only knows how to draw the control, with a
//! [`ResolveValue`] strategy, which decides what the field's value is for a submission and
//! may add markup ahead of the control. Swapping the strategy changes the behaviour of the
//! field without touching rendering.

use crate::html::escape;
use crate::submission::{FormSubmission, UploadedFile};
use crate::StickyResult;

/// Renders a plain `<input type="file">` control.
#[derive(Clone, Debug, Default)]
pub struct FileInput {
    attrs: Vec<(String, String)>,
}

impl FileInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute such as `accept` or `required` to the rendered control.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn render(&self, name: &str) -> String {
        let mut out = format!(r#"<input type="file" name="{}""#, escape(name));
        for (attr, value) in &self.attrs {
            out.push_str(&format!(r#" {}="{}""#, escape(attr), escape(value)));
        }
        out.push('>');
        out
    }
}

/// Decides the effective value of a file field.
pub trait ResolveValue {
    /// Works out the field's value from a submission.
    ///
    /// Called at most once per successful bind.
    fn resolve(
        &mut self,
        name: &str,
        submission: &FormSubmission,
    ) -> StickyResult<Option<UploadedFile>>;

    /// Markup emitted before the control.
    fn prelude(&self, _name: &str) -> String {
        String::new()
    }
}

/// The ordinary behaviour: the value is whatever was uploaded with this submission.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainUpload;

impl ResolveValue for PlainUpload {
    fn resolve(
        &mut self,
        name: &str,
        submission: &FormSubmission,
    ) -> StickyResult<Option<UploadedFile>> {
        Ok(submission.upload(name).cloned())
    }
}

/// A file field for one request.
///
/// Bind it to the submission once with [`Widget::bind`]; the resolved value is kept for the
/// lifetime of the widget and later binds return it unchanged.
#[derive(Debug)]
pub struct Widget<R> {
    input: FileInput,
    resolver: R,
    bound: Option<Option<UploadedFile>>,
}

impl<R: ResolveValue> Widget<R> {
    pub fn new(input: FileInput, resolver: R) -> Self {
        Self {
            input,
            resolver,
            bound: None,
        }
    }

    /// Resolves the field's value from `submission`.
    ///
    /// Only the first successful call does any work. A failed call leaves the widget unbound.
    ///
    /// # Errors
    ///
    /// Propagates the strategy's error.
    pub fn bind(
        &mut self,
        name: &str,
        submission: &FormSubmission,
    ) -> StickyResult<Option<&UploadedFile>> {
        if self.bound.is_none() {
            let value = self.resolver.resolve(name, submission)?;
            self.bound = Some(value);
        }
        Ok(self.value())
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// The bound value; `None` before binding or when the field is empty.
    pub fn value(&self) -> Option<&UploadedFile> {
        self.bound.as_ref().and_then(Option::as_ref)
    }

    /// Takes the bound value out of the widget.
    pub fn take_value(&mut self) -> Option<UploadedFile> {
        self.bound.as_mut().and_then(Option::take)
    }

    /// Strategy prelude followed by the control.
    pub fn render(&self, name: &str) -> String {
        format!("{}{}", self.resolver.prelude(name), self.input.render(name))
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }
}

impl Widget<PlainUpload> {
    pub fn plain() -> Self {
        Self::new(FileInput::new(), PlainUpload)
    }
}

//! Submitted form data, as handed over by the web framework.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use sticky_files::StagedFile;

/// Where an [`UploadedFile`] came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOrigin {
    /// Sent with the current submission
    Submitted,
    /// Recovered from the sticky store; holds the staged copy's location
    Staged(PathBuf),
}

/// A file value for a form field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
    origin: FileOrigin,
}

impl UploadedFile {
    /// A file received with the current request.
    pub fn submitted(
        name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes: bytes.into(),
            origin: FileOrigin::Submitted,
        }
    }

    /// A file rebuilt from its staged copy.
    ///
    /// The content type is not stored, so it is sniffed from the bytes on a best-effort basis.
    pub fn staged(staged: StagedFile) -> Self {
        let content_type = infer::get(&staged.bytes).map(|kind| kind.mime_type().to_owned());
        Self {
            name: staged.name,
            content_type,
            bytes: staged.bytes,
            origin: FileOrigin::Staged(staged.path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// True if the bytes start with the signature of a known image format.
    pub fn is_image(&self) -> bool {
        infer::is_image(&self.bytes)
    }

    pub fn origin(&self) -> &FileOrigin {
        &self.origin
    }

    /// Location of the staged copy, for files recovered from the store.
    pub fn staged_path(&self) -> Option<&Path> {
        match &self.origin {
            FileOrigin::Staged(path) => Some(path),
            FileOrigin::Submitted => None,
        }
    }
}

/// The text fields and files of one form submission.
#[derive(Clone, Debug, Default)]
pub struct FormSubmission {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_field(name, value);
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.insert_file(name, file);
        self
    }

    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn insert_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.files.insert(name.into(), file);
    }

    /// Value of a text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The file genuinely uploaded for `name`.
    ///
    /// Browsers send an empty, unnamed part for a file input the user left alone; that is
    /// reported as no upload.
    pub fn upload(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).filter(|file| !file.name().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_ignores_unnamed_parts() {
        let submission = FormSubmission::new()
            .with_file("doc", UploadedFile::submitted("", None, Vec::new()))
            .with_file("photo", UploadedFile::submitted("me.png", None, vec![1, 2, 3]));

        assert!(submission.upload("doc").is_none());
        assert_eq!(submission.upload("photo").map(UploadedFile::size), Some(3));
        assert!(submission.upload("missing").is_none());
    }

    #[test]
    fn fields_are_looked_up_by_name() {
        let submission = FormSubmission::new().with_field("title", "Holiday");
        assert_eq!(submission.field("title"), Some("Holiday"));
        assert_eq!(submission.field("other"), None);
    }

    #[test]
    fn staged_file_sniffs_content_type() {
        let png_header = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let file = UploadedFile::staged(StagedFile {
            name: "me.png".into(),
            bytes: png_header,
            path: PathBuf::from("/tmp/sticky/tok/1.000000/me.png"),
        });

        assert_eq!(file.content_type(), Some("image/png"));
        assert!(file.is_image());
        assert_eq!(
            file.staged_path(),
            Some(Path::new("/tmp/sticky/tok/1.000000/me.png"))
        );
    }

    #[test]
    fn submitted_file_has_no_staged_path() {
        let file = UploadedFile::submitted("a.txt", Some("text/plain".into()), b"hi".to_vec());
        assert_eq!(file.origin(), &FileOrigin::Submitted);
        assert!(file.staged_path().is_none());
        assert_eq!(file.content_type(), Some("text/plain"));
        assert!(!file.is_image());
    }
}

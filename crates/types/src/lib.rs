//! Validated text types shared across the sticky upload crates.
//!
//! Two wrappers live here:
//! - [`NonEmptyText`]: trimmed text that is guaranteed to contain something.
//! - [`PathSegment`]: text that is safe to use as exactly one directory or file name
//!   component beneath a storage root.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input cannot be used as a single path component
    #[error("Invalid path segment: '{0}'")]
    InvalidSegment(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A single path component.
///
/// Values are used verbatim as directory or file names, so they are never trimmed. A
/// segment is rejected if it is empty, is `.` or `..`, or contains a path separator
/// (`/` or `\`) or a NUL byte. Anything accepted here can be joined onto a root without
/// escaping it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment(String);

impl PathSegment {
    /// Validates `input` as a single path component.
    ///
    /// # Errors
    ///
    /// - [`TextError::Empty`] if `input` is empty.
    /// - [`TextError::InvalidSegment`] if `input` could address anything other than one entry
    ///   directly beneath its parent.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        if input.is_empty() {
            return Err(TextError::Empty);
        }
        if !Self::is_safe(input) {
            return Err(TextError::InvalidSegment(input.to_owned()));
        }
        Ok(Self(input.to_owned()))
    }

    /// Returns true if `input` is usable as a single path component.
    pub fn is_safe(input: &str) -> bool {
        !input.is_empty()
            && input != "."
            && input != ".."
            && !input.contains(['/', '\\', '\0'])
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PathSegment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for PathSegment {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  csrf_token \n").unwrap();
        assert_eq!(text.as_str(), "csrf_token");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
        assert!(matches!(NonEmptyText::new(""), Err(TextError::Empty)));
    }

    #[test]
    fn path_segment_accepts_plain_names() {
        for name in ["photo.jpg", "a b c.pdf", ".hidden", "1767225600.123456", "résumé.doc"] {
            let segment = PathSegment::new(name).unwrap();
            assert_eq!(segment.as_str(), name);
        }
    }

    #[test]
    fn path_segment_keeps_surrounding_whitespace() {
        let segment = PathSegment::new(" spaced ").unwrap();
        assert_eq!(segment.as_str(), " spaced ");
    }

    #[test]
    fn path_segment_rejects_traversal() {
        for name in [".", "..", "../etc", "a/b", "a\\b", "nul\0byte", "/abs"] {
            assert!(
                matches!(PathSegment::new(name), Err(TextError::InvalidSegment(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn path_segment_rejects_empty() {
        assert!(matches!(PathSegment::new(""), Err(TextError::Empty)));
    }
}

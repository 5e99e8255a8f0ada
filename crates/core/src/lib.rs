//! # Sticky Core
//!
//! Form-level logic for sticky uploads.
//!
//! This crate turns a submitted form into field values:
//! - [`Widget`] composes a plain file control with a value strategy
//! - [`StickyUpload`] is the strategy that stages new uploads and recovers staged ones
//! - [`ImageOnly`] narrows any strategy to image files
//! - [`CoreConfig`] is resolved once at startup from `STICKY_UPLOADS_*` variables
//!
//! Storage lives in `sticky-files`; this crate only talks to it through [`StagingStore`].
//!
//! **No API concerns**: HTTP servers and command-line tools belong in `api-rest` and `cli`.

pub mod config;
pub mod constants;
pub mod html;
pub mod image;
pub mod staging;
pub mod sticky;
pub mod submission;
pub mod widget;

mod error;

pub use config::CoreConfig;
pub use error::{StickyError, StickyResult};
pub use image::{ImageOnly, StickyImageInput};
pub use staging::StagingStore;
pub use sticky::{hidden_input_name, StickyFileInput, StickyUpload};
pub use submission::{FileOrigin, FormSubmission, UploadedFile};
pub use widget::{FileInput, PlainUpload, ResolveValue, Widget};

pub use sticky_files;

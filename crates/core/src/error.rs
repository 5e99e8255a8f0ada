use sticky_files::FilesError;

#[derive(Debug, thiserror::Error)]
pub enum StickyError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("sticky storage failed: {0}")]
    Files(#[from] FilesError),
}

pub type StickyResult<T> = std::result::Result<T, StickyError>;

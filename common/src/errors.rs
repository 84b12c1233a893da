/// Failure taxonomy for upload operations.
///
/// Per-file failures (`AlreadyExists`, `Backend`) are recorded on the entry and
/// counted; they do not abort sibling transfers. `NotFound` and `Internal` are
/// fatal to the whole job. Variants are cheap to clone so the first-recorded
/// failure can live both on the entry and in the shared job control.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("source path {0:?} does not exist")]
    NotFound(std::path::PathBuf),
    #[error("{kind} found at {path:?}")]
    AlreadyExists {
        path: std::path::PathBuf,
        kind: &'static str,
    },
    #[error("{context}: {message}")]
    Backend { context: String, message: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn backend(context: impl Into<String>, error: &std::io::Error) -> Self {
        Error::Backend {
            context: context.into(),
            message: error.to_string(),
        }
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }
}

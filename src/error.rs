use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unparseable configuration. Fatal at startup only.
    #[error("Config error: {0}")]
    Config(String),

    /// Git query failed (not a repo, git missing, timeout). The affected
    /// view degrades to "git status unavailable".
    #[error("Git error: {0}")]
    Git(String),

    /// Filesystem watcher failed. Live auto-refresh is disabled for the
    /// session; manual refresh keeps working.
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Session persistence failed. Logged, defaults substituted.
    #[error("Session error: {0}")]
    Session(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl From<notify::Error> for AppError {
    fn from(err: notify::Error) -> Self {
        AppError::Watcher(err.to_string())
    }
}

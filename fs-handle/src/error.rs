//! Error types for the directory handle.

use thiserror::Error;

/// Result type alias for handle operations.
pub type Result<T> = std::result::Result<T, FsHandleError>;

/// Errors that can occur in the directory handle.
///
/// Navigation misses (descending into a file, ascending past the root) are
/// deliberately not represented here: callers probe paths interactively, so
/// those are signalled with a plain `false` instead.
#[derive(Error, Debug)]
pub enum FsHandleError {
    /// Path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Path resolves outside the configured root boundary.
    #[error("path outside root boundary: {0}")]
    OutsideRoot(String),

    /// The handle has been closed.
    #[error("handle is closed")]
    Closed,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

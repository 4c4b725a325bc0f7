//! Current-directory cursor with bounded navigation.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{FsHandleError, Result};

/// Owns the current-directory cursor and enforces the root boundary.
///
/// The cursor is always an absolute, canonicalized path to a directory that
/// existed when it was last moved, and never resolves above the configured
/// root. Navigation misses return `false` rather than an error: callers
/// probe paths interactively and a miss is an expected outcome, not a
/// fault.
#[derive(Debug, Clone)]
pub struct PathNavigator {
    /// Current cursor position.
    current: PathBuf,

    /// Upper boundary; `ascend` refuses to move above this.
    root: PathBuf,
}

impl PathNavigator {
    /// Create a navigator rooted at the filesystem root.
    pub fn new(initial: impl AsRef<Path>) -> Result<Self> {
        Self::with_root(initial, Path::new("/"))
    }

    /// Create a navigator confined to `root`.
    ///
    /// Fails if `initial` does not exist, is not a directory, or lies
    /// outside `root`.
    pub fn with_root(initial: impl AsRef<Path>, root: impl AsRef<Path>) -> Result<Self> {
        let current = canonical_directory(initial.as_ref())?;
        let root = canonical_directory(root.as_ref())?;

        if !current.starts_with(&root) {
            return Err(FsHandleError::OutsideRoot(current.display().to_string()));
        }

        Ok(Self { current, root })
    }

    /// Move the cursor into the named child directory.
    ///
    /// `name` must be a single path component; separators and relative
    /// segments are rejected. Returns `false` (cursor unchanged) if the
    /// child does not exist or is not a directory. Symbolic links are not
    /// followed, so a symlink to a directory is not enterable.
    pub fn descend(&mut self, name: &str) -> bool {
        if !is_plain_name(name) {
            debug!("rejected descend into non-plain name: {name:?}");
            return false;
        }

        let target = self.current.join(name);
        match target.symlink_metadata() {
            Ok(metadata) if metadata.is_dir() => {
                self.current = target;
                true
            }
            _ => false,
        }
    }

    /// Move the cursor to its parent directory.
    ///
    /// Returns `false` (cursor unchanged) when the cursor is already at
    /// the root boundary.
    pub fn ascend(&mut self) -> bool {
        if self.current == self.root {
            return false;
        }

        match self.current.parent() {
            Some(parent) => {
                self.current = parent.to_path_buf();
                true
            }
            None => false,
        }
    }

    /// The current cursor position.
    pub fn current_path(&self) -> &Path {
        &self.current
    }

    /// The configured root boundary.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Canonicalize `path` and require it to be an existing directory.
fn canonical_directory(path: &Path) -> Result<PathBuf> {
    let canonical = path.canonicalize().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FsHandleError::DirectoryNotFound(path.display().to_string())
        } else {
            FsHandleError::Io(e)
        }
    })?;

    if !canonical.is_dir() {
        return Err(FsHandleError::NotADirectory(path.display().to_string()));
    }

    Ok(canonical)
}

/// A child name is a single normal path component: no separators, no `.`
/// or `..`, not empty.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

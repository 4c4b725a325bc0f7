//! Directory listing builder.

use std::path::Path;

use tracing::debug;

use crate::entry::ListingEntry;
use crate::error::Result;

/// Enumerate the immediate children of `path`.
///
/// All-or-nothing: if the directory itself cannot be read (removed
/// concurrently, permission denied) the whole call fails. Individual
/// entries that vanish between enumeration and stat are skipped, since the
/// directory may be mutated while we scan it. Symbolic links are not
/// followed. Entries are sorted by name.
pub fn list_directory(path: &Path) -> Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();

    for dir_entry in std::fs::read_dir(path)? {
        let dir_entry = match dir_entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping unreadable entry in {}: {e}", path.display());
                continue;
            }
        };

        // lstat, so a symlinked directory reports as a plain entry.
        let metadata = match dir_entry.path().symlink_metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(
                    "entry vanished during listing of {}: {e}",
                    path.display()
                );
                continue;
            }
        };

        let name = dir_entry.file_name().to_string_lossy().into_owned();
        entries.push(ListingEntry::from_metadata(name, &metadata));
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_lists_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
        let mut file = File::create(temp_dir.path().join("data.txt")).unwrap();
        writeln!(file, "hello").unwrap();

        let entries = list_directory(temp_dir.path()).unwrap();
        assert_eq!(entries.len(), 2);

        // Sorted by name: data.txt before sub.
        assert_eq!(entries[0].name, "data.txt");
        assert!(!entries[0].is_directory);
        assert_eq!(entries[0].size, Some(6));
        assert!(entries[0].modified.is_some());

        assert_eq!(entries[1].name, "sub");
        assert!(entries[1].is_directory);
        assert_eq!(entries[1].size, None);
    }

    #[test]
    fn test_empty_directory_lists_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_directory(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = list_directory(&temp_dir.path().join("nope"));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_is_not_a_directory_entry() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("target")).unwrap();
        std::os::unix::fs::symlink(
            temp_dir.path().join("target"),
            temp_dir.path().join("link"),
        )
        .unwrap();

        let entries = list_directory(temp_dir.path()).unwrap();
        let link = entries.iter().find(|e| e.name == "link").unwrap();
        assert!(!link.is_directory);
    }
}

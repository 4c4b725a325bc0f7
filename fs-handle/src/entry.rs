//! Listing entries and update events.

use std::fs::Metadata;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immediate child of a listed directory.
///
/// A snapshot taken at listing time; never cached across calls. The
/// directory flag is determined without following symbolic links, so a
/// symlink to a directory reports as a non-directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Base name of the entry (no path separators).
    pub name: String,

    /// Whether the entry is a directory.
    pub is_directory: bool,

    /// Size in bytes, if known.
    pub size: Option<u64>,

    /// Last modification time, if known.
    pub modified: Option<DateTime<Utc>>,
}

impl ListingEntry {
    /// Build an entry from a base name and its metadata.
    pub fn from_metadata(name: impl Into<String>, metadata: &Metadata) -> Self {
        Self {
            name: name.into(),
            is_directory: metadata.is_dir(),
            size: metadata.is_file().then(|| metadata.len()),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        }
    }
}

/// Kind of detected change in the watched directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// An entry was created.
    Create,

    /// An entry was deleted.
    Delete,

    /// An entry's contents changed.
    Modify,
}

impl UpdateKind {
    /// Map a raw notify event kind onto the closed update-kind set.
    ///
    /// Returns `None` for raw kinds that must not surface to observers
    /// (access notifications and catch-all kinds). A rename is reported as
    /// the disappearance of the old name and the appearance of the new
    /// one; the paired rename notification some backends emit alongside
    /// the `From`/`To` pair carries the same information and is discarded,
    /// so a rename never leaks extra events.
    pub fn from_raw(kind: notify::EventKind) -> Option<Self> {
        use notify::EventKind;
        use notify::event::{ModifyKind, RenameMode};

        match kind {
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Remove(_) => Some(Self::Delete),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(Self::Delete),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Self::Create),
            EventKind::Modify(ModifyKind::Name(_)) => None,
            EventKind::Modify(_) => Some(Self::Modify),
            _ => None,
        }
    }
}

/// One detected change, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    /// Base name of the changed entry.
    pub name: String,

    /// What happened to the entry.
    pub kind: UpdateKind,

    /// Whether the entry is a directory. `None` for deletions, where the
    /// entry no longer exists to be classified.
    pub is_directory: Option<bool>,

    /// When the change was observed.
    pub timestamp: DateTime<Utc>,
}

impl UpdateEvent {
    /// Build an event for a changed path.
    ///
    /// Returns `None` when the path has no usable base name.
    pub fn for_path(kind: UpdateKind, path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().into_owned();

        let is_directory = match kind {
            UpdateKind::Delete => None,
            _ => path
                .symlink_metadata()
                .ok()
                .map(|metadata| metadata.is_dir()),
        };

        Some(Self {
            name,
            kind,
            is_directory,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind, RenameMode};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_raw_kind_mapping() {
        assert_eq!(
            UpdateKind::from_raw(EventKind::Create(CreateKind::File)),
            Some(UpdateKind::Create)
        );
        assert_eq!(
            UpdateKind::from_raw(EventKind::Remove(RemoveKind::Any)),
            Some(UpdateKind::Delete)
        );
        assert_eq!(
            UpdateKind::from_raw(EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(UpdateKind::Modify)
        );
    }

    #[test]
    fn test_renames_map_to_create_and_delete() {
        assert_eq!(
            UpdateKind::from_raw(EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            Some(UpdateKind::Delete)
        );
        assert_eq!(
            UpdateKind::from_raw(EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            Some(UpdateKind::Create)
        );
    }

    #[test]
    fn test_paired_rename_notifications_are_discarded() {
        // Some backends emit these alongside the From/To pair; surfacing
        // them would turn one rename into four events.
        assert_eq!(
            UpdateKind::from_raw(EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            None
        );
        assert_eq!(
            UpdateKind::from_raw(EventKind::Modify(ModifyKind::Name(RenameMode::Any))),
            None
        );
        assert_eq!(
            UpdateKind::from_raw(EventKind::Modify(ModifyKind::Name(RenameMode::Other))),
            None
        );
    }

    #[test]
    fn test_noise_kinds_are_filtered() {
        assert_eq!(
            UpdateKind::from_raw(EventKind::Access(AccessKind::Read)),
            None
        );
        assert_eq!(UpdateKind::from_raw(EventKind::Any), None);
        assert_eq!(UpdateKind::from_raw(EventKind::Other), None);
    }

    #[test]
    fn test_delete_event_has_no_directory_flag() {
        let event = UpdateEvent::for_path(UpdateKind::Delete, Path::new("/gone/file.txt"))
            .expect("path has a base name");

        assert_eq!(event.name, "file.txt");
        assert_eq!(event.kind, UpdateKind::Delete);
        assert_eq!(event.is_directory, None);
    }

    #[test]
    fn test_event_for_root_path_is_rejected() {
        assert!(UpdateEvent::for_path(UpdateKind::Create, Path::new("/")).is_none());
    }
}

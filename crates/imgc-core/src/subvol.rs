//! The copy-on-write subvolume driver interface (component 4.I).
//!
//! The actual subvolume driver — `btrfs` subvolume create/snapshot/delete,
//! symlink-escape-safe path resolution — is an external collaborator (§6).
//! This module defines only the trait the core depends on, plus
//! [`FakeSubvolume`], an in-memory test double the core's own test suite
//! drives instead of a real filesystem.

use imgc_schema::NormalizedPath;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::DriverError;

/// What kind of filesystem entry `SubvolumeDriver::existing_entries` found at
/// a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory.
    Directory,
    /// Anything else (regular file, symlink, device, fifo, ...).
    File,
}

/// The operations the compiler core needs from a copy-on-write subvolume.
///
/// `existing_entries` and `mountpoints` are the hooks that let the plan
/// driver (4.H) recover what a `FilesystemRootItem`/`ParentLayerItem`
/// actually put in place, once its phase builder has run — the core itself
/// never inspects a real filesystem.
pub trait SubvolumeDriver {
    /// Create a fresh, empty subvolume (`FilesystemRootItem`'s phase builder).
    ///
    /// # Errors
    /// Returns [`DriverError::Subvolume`] if subvolume creation fails.
    fn create(&mut self) -> Result<(), DriverError>;

    /// Snapshot an existing subvolume as the parent layer
    /// (`ParentLayerItem`'s phase builder).
    ///
    /// # Errors
    /// Returns [`DriverError::Subvolume`] if the snapshot fails.
    fn snapshot(&mut self, source: &Path) -> Result<(), DriverError>;

    /// Run `argv` as root inside the subvolume (used by the remove-paths
    /// phase builder and RPM driver invocations that need an install root).
    ///
    /// # Errors
    /// Returns [`DriverError::Subvolume`] if the command cannot be run or
    /// exits non-zero.
    fn run_as_root(&mut self, argv: &[&str]) -> Result<(), DriverError>;

    /// Resolve an image-relative path to its location inside the subvolume.
    /// `no_deref_leaf` requests that the leaf component itself not be
    /// followed if it is a symlink (needed when about to replace it).
    fn path(&self, rel: &str, no_deref_leaf: bool) -> PathBuf;

    /// Flip the subvolume's top-level read-only flag.
    ///
    /// # Errors
    /// Returns [`DriverError::Subvolume`] if the flag cannot be changed.
    fn set_readonly(&mut self, read_only: bool) -> Result<(), DriverError>;

    /// Every entry currently present in the subvolume, excluding protected
    /// paths, as `(kind, path)` pairs. Consulted once, right after the
    /// `PARENT_LAYER` phase builder runs, to seed the provides map the
    /// validator and dependency graph build additive items against.
    ///
    /// # Errors
    /// Returns [`DriverError::Subvolume`] if the subvolume cannot be walked.
    fn existing_entries(&self) -> Result<Vec<(EntryKind, NormalizedPath)>, DriverError>;

    /// Every active mountpoint recorded under
    /// `meta/private/mount/<mountpoint>/MOUNT/`.
    ///
    /// # Errors
    /// Returns [`DriverError::Subvolume`] if the mount metadata tree cannot
    /// be read.
    fn mountpoints(&self) -> Result<Vec<NormalizedPath>, DriverError>;
}

/// An in-memory [`SubvolumeDriver`] for the core's own test suite.
///
/// Tracks directories and files as plain sets rather than touching a real
/// filesystem, matching the corpus's preference for fakes over mocks in
/// unit tests that must not shell out.
#[derive(Debug, Default)]
pub struct FakeSubvolume {
    directories: BTreeSet<String>,
    files: BTreeSet<String>,
    mountpoints: BTreeSet<String>,
    created: bool,
    read_only: bool,
    run_log: Vec<Vec<String>>,
}

impl FakeSubvolume {
    /// Construct an empty fake subvolume (nothing created yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the fake with a directory that already exists, as if a prior
    /// layer had created it (used to build `ParentLayerItem` test fixtures
    /// without going through `snapshot`).
    pub fn seed_directory(&mut self, path: &str) {
        self.directories.insert(path.to_string());
    }

    /// Seed the fake with a file that already exists.
    pub fn seed_file(&mut self, path: &str) {
        self.files.insert(path.to_string());
    }

    /// Seed the fake with an active mountpoint.
    pub fn seed_mountpoint(&mut self, path: &str) {
        self.mountpoints.insert(path.to_string());
    }

    /// Every `run_as_root` invocation recorded so far, in call order. Tests
    /// use this to assert on the remove-paths phase's exact argv ordering.
    pub fn run_log(&self) -> &[Vec<String>] {
        &self.run_log
    }

    /// Whether `create` or `snapshot` has been called yet.
    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl SubvolumeDriver for FakeSubvolume {
    fn create(&mut self) -> Result<(), DriverError> {
        self.created = true;
        self.directories.insert(String::new());
        Ok(())
    }

    fn snapshot(&mut self, _source: &Path) -> Result<(), DriverError> {
        self.created = true;
        self.directories.insert(String::new());
        Ok(())
    }

    fn run_as_root(&mut self, argv: &[&str]) -> Result<(), DriverError> {
        self.run_log
            .push(argv.iter().map(ToString::to_string).collect());
        Ok(())
    }

    fn path(&self, rel: &str, _no_deref_leaf: bool) -> PathBuf {
        PathBuf::from("/fake-subvolume").join(rel)
    }

    fn set_readonly(&mut self, read_only: bool) -> Result<(), DriverError> {
        self.read_only = read_only;
        Ok(())
    }

    fn existing_entries(&self) -> Result<Vec<(EntryKind, NormalizedPath)>, DriverError> {
        let mut out = Vec::new();
        for dir in &self.directories {
            if let Ok(p) = imgc_schema::normalize_image_relative(dir) {
                out.push((EntryKind::Directory, p));
            }
        }
        for file in &self.files {
            if let Ok(p) = imgc_schema::normalize_image_relative(file) {
                out.push((EntryKind::File, p));
            }
        }
        Ok(out)
    }

    fn mountpoints(&self) -> Result<Vec<NormalizedPath>, DriverError> {
        Ok(self
            .mountpoints
            .iter()
            .filter_map(|m| imgc_schema::normalize_image_relative(m).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_marks_root_directory_present() {
        let mut subvol = FakeSubvolume::new();
        subvol.create().unwrap();
        let entries = subvol.existing_entries().unwrap();
        assert!(entries.iter().any(|(kind, _)| *kind == EntryKind::Directory));
    }

    fn seeded() -> FakeSubvolume {
        let mut subvol = FakeSubvolume::new();
        subvol.seed_directory("a/b");
        subvol.seed_file("a/b/F");
        subvol.seed_mountpoint("mnt/data");
        subvol
    }

    #[test]
    fn seeded_entries_round_trip() {
        let subvol = seeded();
        let entries = subvol.existing_entries().unwrap();
        assert!(entries
            .iter()
            .any(|(kind, path)| *kind == EntryKind::Directory && path.as_str() == "a/b"));
        assert!(entries
            .iter()
            .any(|(kind, path)| *kind == EntryKind::File && path.as_str() == "a/b/F"));
    }

    #[test]
    fn mountpoints_round_trip() {
        let subvol = seeded();
        let mounts = subvol.mountpoints().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].as_str(), "mnt/data");
    }

    #[test]
    fn run_as_root_is_recorded_in_order() {
        let mut subvol = FakeSubvolume::new();
        subvol.run_as_root(&["rm", "-rf", "a"]).unwrap();
        subvol.run_as_root(&["rm", "-rf", "b"]).unwrap();
        assert_eq!(subvol.run_log().len(), 2);
        assert_eq!(subvol.run_log()[0], vec!["rm", "-rf", "a"]);
    }
}

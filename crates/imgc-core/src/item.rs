//! The item model (component C): a closed sum type of image items, each
//! carrying its own normalized fields plus a `phase_order()` that decides
//! whether the phase scheduler (D) or the dependency resolver (E/F) owns it.
//!
//! Construction is the single place an item can fail: path normalization,
//! enum coercion, tarball hashing, and mount-config validation all happen in
//! the `Item::new_*` constructors below, never later. Once constructed, an
//! item is immutable — the compiler holds it by value and never mutates it.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use imgc_schema::{
    normalize_image_relative, rsync_dest, BuildSource, Digest, NormalizedPath, Phase, Provide,
    RawMountConfig, Requirement,
};

use crate::error::CompilerError;

/// A single declarative image item, fully normalized and validated at
/// construction time.
#[derive(Debug, Clone)]
pub enum Item {
    /// Creates a fresh, empty subvolume. Exactly one of
    /// `FilesystemRoot`/`ParentLayer` must exist in a valid build.
    FilesystemRoot {
        /// Opaque declaration-site identifier, for diagnostics.
        from_target: String,
    },
    /// Snapshots an existing subvolume as the parent layer.
    ParentLayer {
        /// Opaque declaration-site identifier, for diagnostics.
        from_target: String,
        /// The subvolume to snapshot from.
        source: PathBuf,
    },
    /// Extracts a tarball under a directory.
    Tarball(TarballItem),
    /// Copies a single host file into the image.
    CopyFile(CopyFileItem),
    /// A symlink whose target is expected to be a directory.
    SymlinkToDir(SymlinkItem),
    /// A symlink whose target is expected to be a non-directory file.
    SymlinkToFile(SymlinkItem),
    /// Creates a chain of intermediate directories.
    MakeDirs(MakeDirsItem),
    /// Reserves a mountpoint; the actual mount happens outside the core.
    Mount(MountItem),
    /// Removes a path during the `REMOVE_PATHS` phase.
    RemovePath(RemovePathItem),
    /// Installs or removes an RPM package during the `RPM_INSTALL`/`RPM_REMOVE` phase.
    RpmAction(RpmActionItem),
}

impl Item {
    /// This item's declaration site, for diagnostics.
    pub fn from_target(&self) -> &str {
        match self {
            Self::FilesystemRoot { from_target } | Self::ParentLayer { from_target, .. } => {
                from_target
            }
            Self::Tarball(i) => &i.from_target,
            Self::CopyFile(i) => &i.from_target,
            Self::SymlinkToDir(i) | Self::SymlinkToFile(i) => &i.from_target,
            Self::MakeDirs(i) => &i.from_target,
            Self::Mount(i) => &i.from_target,
            Self::RemovePath(i) => &i.from_target,
            Self::RpmAction(i) => &i.from_target,
        }
    }

    /// Which phase this item belongs to, or `None` if it is additive.
    pub fn phase_order(&self) -> Option<Phase> {
        match self {
            Self::FilesystemRoot { .. } | Self::ParentLayer { .. } => Some(Phase::ParentLayer),
            Self::RemovePath(_) => Some(Phase::RemovePaths),
            Self::RpmAction(i) => Some(match i.action {
                RpmAction::Install => Phase::RpmInstall,
                RpmAction::RemoveIfExists => Phase::RpmRemove,
            }),
            Self::Tarball(_)
            | Self::CopyFile(_)
            | Self::SymlinkToDir(_)
            | Self::SymlinkToFile(_)
            | Self::MakeDirs(_)
            | Self::Mount(_) => None,
        }
    }

    /// The filesystem claims this item makes, if additive. Empty for phase
    /// items — their contribution to the provides map is recovered from the
    /// subvolume driver after their phase builder runs (4.H).
    pub fn provides(&self) -> Vec<Provide> {
        match self {
            Self::Tarball(i) => i.provides.clone(),
            Self::CopyFile(i) => vec![Provide::File(i.dest.clone())],
            Self::SymlinkToDir(i) => vec![Provide::Directory(i.dest.clone())],
            Self::SymlinkToFile(i) => vec![Provide::File(i.dest.clone())],
            Self::MakeDirs(i) => i
                .intermediate_dirs
                .iter()
                .cloned()
                .map(Provide::Directory)
                .collect(),
            Self::Mount(i) => vec![Provide::DoNotAccess(i.mountpoint.clone())],
            Self::FilesystemRoot { .. }
            | Self::ParentLayer { .. }
            | Self::RemovePath(_)
            | Self::RpmAction(_) => Vec::new(),
        }
    }

    /// The pre-existing filesystem this item needs, if additive.
    pub fn requires(&self) -> Vec<Requirement> {
        match self {
            Self::Tarball(i) => vec![Requirement::Directory(i.into_dir.clone())],
            Self::CopyFile(i) => vec![Requirement::Directory(i.dest.dirname())],
            Self::SymlinkToDir(i) => vec![
                Requirement::Directory(i.source.clone()),
                Requirement::Directory(i.dest.dirname()),
            ],
            Self::SymlinkToFile(i) => vec![
                Requirement::File(i.source.clone()),
                Requirement::Directory(i.dest.dirname()),
            ],
            Self::MakeDirs(i) => vec![Requirement::Directory(i.into_dir.clone())],
            Self::Mount(i) => vec![Requirement::Directory(i.mountpoint.dirname())],
            Self::FilesystemRoot { .. }
            | Self::ParentLayer { .. }
            | Self::RemovePath(_)
            | Self::RpmAction(_) => Vec::new(),
        }
    }

    /// The primary output path an additive item writes to, consulted by the
    /// plan driver (4.H step 4) against the protected-path tracker. `None`
    /// for phase items, which the driver never re-checks this way.
    pub fn primary_output(&self) -> Option<&NormalizedPath> {
        match self {
            Self::Tarball(i) => Some(&i.into_dir),
            Self::CopyFile(i) => Some(&i.dest),
            Self::SymlinkToDir(i) | Self::SymlinkToFile(i) => Some(&i.dest),
            Self::MakeDirs(i) => i.intermediate_dirs.last(),
            Self::Mount(i) => Some(&i.mountpoint),
            Self::FilesystemRoot { .. }
            | Self::ParentLayer { .. }
            | Self::RemovePath(_)
            | Self::RpmAction(_) => None,
        }
    }
}

fn normalize(from_target: &str, raw: &str) -> Result<NormalizedPath, CompilerError> {
    normalize_image_relative(raw).map_err(|e| CompilerError::from_path_error(from_target, e))
}

impl Item {
    /// Construct a `FilesystemRootItem`.
    pub fn new_filesystem_root(from_target: impl Into<String>) -> Self {
        Self::FilesystemRoot {
            from_target: from_target.into(),
        }
    }

    /// Construct a `ParentLayerItem` pointing at an existing subvolume.
    pub fn new_parent_layer(from_target: impl Into<String>, source: PathBuf) -> Self {
        Self::ParentLayer {
            from_target: from_target.into(),
            source,
        }
    }

    /// Construct a `MakeDirsItem`: every intermediate directory from
    /// `into_dir/path_to_make` up to (not including) `into_dir`.
    ///
    /// # Errors
    /// Propagates [`CompilerError::IllegalPath`]/[`CompilerError::ReservedMetaPath`].
    pub fn new_make_dirs(
        from_target: impl Into<String>,
        into_dir: &str,
        path_to_make: &str,
    ) -> Result<Self, CompilerError> {
        let from_target = from_target.into();
        let into_dir = normalize(&from_target, into_dir)?;
        let mut intermediate_dirs = Vec::new();
        let mut current = into_dir.as_str().to_string();
        for segment in path_to_make.split('/').filter(|s| !s.is_empty()) {
            current = if current.is_empty() {
                segment.to_string()
            } else {
                format!("{current}/{segment}")
            };
            intermediate_dirs.push(normalize(&from_target, &current)?);
        }
        Ok(Self::MakeDirs(MakeDirsItem {
            from_target,
            into_dir,
            intermediate_dirs,
        }))
    }

    /// Construct a `CopyFileItem`. `dest` follows the rsync destination
    /// convention: a trailing `/` means "into this directory".
    ///
    /// # Errors
    /// Propagates path normalization errors.
    pub fn new_copy_file(
        from_target: impl Into<String>,
        source: PathBuf,
        dest: &str,
    ) -> Result<Self, CompilerError> {
        let from_target = from_target.into();
        let dest = rsync_dest(dest, &source.to_string_lossy())
            .map_err(|e| CompilerError::from_path_error(&from_target, e))?;
        Ok(Self::CopyFile(CopyFileItem {
            from_target,
            source,
            dest,
        }))
    }

    /// Construct a `SymlinkToDirItem`.
    ///
    /// # Errors
    /// Propagates path normalization errors.
    pub fn new_symlink_to_dir(
        from_target: impl Into<String>,
        source: &str,
        dest: &str,
    ) -> Result<Self, CompilerError> {
        let from_target = from_target.into();
        let source = normalize(&from_target, source)?;
        let dest = rsync_dest(dest, source.as_str())
            .map_err(|e| CompilerError::from_path_error(&from_target, e))?;
        Ok(Self::SymlinkToDir(SymlinkItem {
            from_target,
            source,
            dest,
        }))
    }

    /// Construct a `SymlinkToFileItem`.
    ///
    /// # Errors
    /// Propagates path normalization errors.
    pub fn new_symlink_to_file(
        from_target: impl Into<String>,
        source: &str,
        dest: &str,
    ) -> Result<Self, CompilerError> {
        let from_target = from_target.into();
        let source = normalize(&from_target, source)?;
        let dest = rsync_dest(dest, source.as_str())
            .map_err(|e| CompilerError::from_path_error(&from_target, e))?;
        Ok(Self::SymlinkToFile(SymlinkItem {
            from_target,
            source,
            dest,
        }))
    }

    /// Construct a `RemovePathItem`.
    ///
    /// # Errors
    /// Propagates path normalization errors, or [`CompilerError::BadEnum`]
    /// for an unrecognized action string.
    pub fn new_remove_path(
        from_target: impl Into<String>,
        path: &str,
        action: &str,
    ) -> Result<Self, CompilerError> {
        let from_target = from_target.into();
        let path = normalize(&from_target, path)?;
        let action = RemoveAction::parse(&from_target, action)?;
        Ok(Self::RemovePath(RemovePathItem {
            from_target,
            path,
            action,
        }))
    }

    /// Construct an `RpmActionItem`.
    ///
    /// # Errors
    /// Returns [`CompilerError::BadEnum`] for an unrecognized action string.
    pub fn new_rpm_action(
        from_target: impl Into<String>,
        name: &str,
        action: &str,
    ) -> Result<Self, CompilerError> {
        let from_target = from_target.into();
        let action = RpmAction::parse(&from_target, action)?;
        Ok(Self::RpmAction(RpmActionItem {
            from_target,
            name: name.to_string(),
            action,
        }))
    }

    /// Construct a `MountItem` from its already-parsed `mountconfig.json`
    /// shape and an explicit mountpoint override (may be empty to fall back
    /// to `default_mountpoint`).
    ///
    /// # Errors
    /// Returns [`CompilerError::UnknownMountConfig`] if leftover keys
    /// remain, [`CompilerError::HostMountDisallowed`] if a host mount is
    /// declared outside a permitted prefix, or path errors from the
    /// resolved mountpoint.
    pub fn new_mount(
        from_target: impl Into<String>,
        mountpoint_override: Option<&str>,
        config: RawMountConfig,
        allowed_host_mount_prefixes: &[&str],
    ) -> Result<Self, CompilerError> {
        let from_target = from_target.into();
        if !config.unknown.is_empty() {
            return Err(CompilerError::UnknownMountConfig {
                from_target,
                keys: config.unknown.keys().cloned().collect(),
            });
        }
        let is_directory = config.is_directory.ok_or_else(|| CompilerError::BadEnum {
            from_target: from_target.clone(),
            field: "is_directory".to_string(),
            value: "<missing>".to_string(),
        })?;
        let build_source = config.build_source.ok_or_else(|| CompilerError::BadEnum {
            from_target: from_target.clone(),
            field: "build_source".to_string(),
            value: "<missing>".to_string(),
        })?;

        if config.is_repo_root && (mountpoint_override.is_some() || config.default_mountpoint.is_some()) {
            return Err(CompilerError::BadEnum {
                from_target,
                field: "is_repo_root".to_string(),
                value: "mountpoint also given".to_string(),
            });
        }

        if build_source.source_type == "host"
            && !allowed_host_mount_prefixes
                .iter()
                .any(|prefix| from_target.starts_with(prefix))
        {
            return Err(CompilerError::HostMountDisallowed { from_target });
        }

        // Unlike `build_source`, a host-type `runtime_source` is never
        // permitted, from any declaration site: it would ask the runtime
        // to mount an arbitrary host path into the running container,
        // which no prefix policy is meant to allow.
        let runtime_declares_host = config
            .runtime_source
            .as_ref()
            .and_then(|v| v.get("type"))
            .and_then(serde_json::Value::as_str)
            == Some("host");
        if runtime_declares_host {
            return Err(CompilerError::HostMountDisallowed { from_target });
        }

        let raw_mountpoint = mountpoint_override
            .or(config.default_mountpoint.as_deref())
            .ok_or_else(|| CompilerError::BadEnum {
                from_target: from_target.clone(),
                field: "mountpoint".to_string(),
                value: "<missing>".to_string(),
            })?;
        let mountpoint = normalize(&from_target, raw_mountpoint)?;

        Ok(Self::Mount(MountItem {
            from_target,
            mountpoint,
            is_directory,
            build_source,
            runtime_source: config.runtime_source.unwrap_or(serde_json::Value::Null),
        }))
    }

    /// Construct a `TarballItem`: hashes the tarball's bytes against the
    /// declared digest and enumerates every entry it would extract.
    ///
    /// # Errors
    /// Returns [`CompilerError::HashMismatch`] on digest mismatch, or
    /// [`CompilerError::Driver`] if the tarball cannot be read or parsed.
    pub fn new_tarball(
        from_target: impl Into<String>,
        into_dir: &str,
        tarball: PathBuf,
        declared_hash: &str,
        force_root_ownership: bool,
    ) -> Result<Self, CompilerError> {
        let from_target = from_target.into();
        let into_dir = normalize(&from_target, into_dir)?;

        let bytes = std::fs::read(&tarball).map_err(|e| {
            CompilerError::Driver(crate::error::DriverError::Subvolume(format!(
                "{from_target}: failed to read tarball '{}': {e}",
                tarball.display()
            )))
        })?;

        let declared = Digest::parse(declared_hash).map_err(|e| CompilerError::BadEnum {
            from_target: from_target.clone(),
            field: "hash".to_string(),
            value: e.to_string(),
        })?;
        if !declared.matches(&bytes) {
            let actual = match &declared {
                Digest::Sha256(_) => {
                    Digest::Sha256(imgc_schema::Sha256Digest::compute(&bytes)).to_string()
                }
                Digest::Blake3(_) => {
                    Digest::Blake3(imgc_schema::Blake3Digest::compute(&bytes)).to_string()
                }
            };
            return Err(CompilerError::HashMismatch {
                from_target,
                expected: declared.to_string(),
                actual,
            });
        }

        let provides = list_tar_entries(&tarball, &bytes, &into_dir, &from_target)?;

        Ok(Self::Tarball(TarballItem {
            from_target,
            into_dir,
            tarball,
            hash: declared,
            force_root_ownership,
            provides,
        }))
    }
}

fn list_tar_entries(
    tarball: &Path,
    bytes: &[u8],
    into_dir: &NormalizedPath,
    from_target: &str,
) -> Result<Vec<Provide>, CompilerError> {
    let io_err = |e: std::io::Error| {
        CompilerError::Driver(crate::error::DriverError::Subvolume(format!(
            "{from_target}: failed to read tarball '{}': {e}",
            tarball.display()
        )))
    };

    let is_gzip = tarball
        .extension()
        .is_some_and(|e| e == "gz" || e == "tgz");
    let is_zstd = tarball.extension().is_some_and(|e| e == "zst");

    let reader: Box<dyn Read> = if is_gzip {
        Box::new(flate2::read::GzDecoder::new(Cursor::new(bytes)))
    } else if is_zstd {
        Box::new(zstd::stream::read::Decoder::new(Cursor::new(bytes)).map_err(io_err)?)
    } else {
        Box::new(Cursor::new(bytes))
    };

    let mut archive = tar::Archive::new(reader);
    let mut provides = Vec::new();
    for entry in archive.entries().map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let entry_path = entry.path().map_err(io_err)?;
        let rel = entry_path.to_string_lossy();
        if rel.is_empty() || rel == "." {
            continue;
        }
        let full = into_dir.join(&rel);
        let normalized =
            normalize_image_relative(&full).map_err(|e| CompilerError::from_path_error(from_target, e))?;
        provides.push(if entry.header().entry_type().is_dir() {
            Provide::Directory(normalized)
        } else {
            Provide::File(normalized)
        });
    }
    Ok(provides)
}

/// `TarballItem`'s normalized fields.
#[derive(Debug, Clone)]
pub struct TarballItem {
    /// Opaque declaration-site identifier, for diagnostics.
    pub from_target: String,
    /// Where the tarball is extracted to, image-relative.
    pub into_dir: NormalizedPath,
    /// Host path of the tarball file.
    pub tarball: PathBuf,
    /// The declared, verified content hash.
    pub hash: Digest,
    /// Whether extracted entries should be forced to root ownership.
    pub force_root_ownership: bool,
    provides: Vec<Provide>,
}

/// `CopyFileItem`'s normalized fields.
#[derive(Debug, Clone)]
pub struct CopyFileItem {
    /// Opaque declaration-site identifier, for diagnostics.
    pub from_target: String,
    /// Host path of the file to copy.
    pub source: PathBuf,
    /// Normalized destination path.
    pub dest: NormalizedPath,
}

/// Shared fields for `SymlinkToDirItem`/`SymlinkToFileItem`.
#[derive(Debug, Clone)]
pub struct SymlinkItem {
    /// Opaque declaration-site identifier, for diagnostics.
    pub from_target: String,
    /// Normalized symlink target, image-relative.
    pub source: NormalizedPath,
    /// Normalized symlink location.
    pub dest: NormalizedPath,
}

/// `MakeDirsItem`'s normalized fields.
#[derive(Debug, Clone)]
pub struct MakeDirsItem {
    /// Opaque declaration-site identifier, for diagnostics.
    pub from_target: String,
    /// The pre-existing directory `path_to_make` is resolved under.
    pub into_dir: NormalizedPath,
    /// Every intermediate directory from `into_dir` down to the leaf,
    /// in descending order (leaf last).
    pub intermediate_dirs: Vec<NormalizedPath>,
}

/// `MountItem`'s normalized fields.
#[derive(Debug, Clone)]
pub struct MountItem {
    /// Opaque declaration-site identifier, for diagnostics.
    pub from_target: String,
    /// The reserved, do-not-access mountpoint.
    pub mountpoint: NormalizedPath,
    /// Whether the mount source is a directory.
    pub is_directory: bool,
    /// The build-time source descriptor.
    pub build_source: BuildSource,
    /// The opaque runtime-side descriptor.
    pub runtime_source: serde_json::Value,
}

/// The action a `RemovePathItem` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveAction {
    /// Fail if the path doesn't exist.
    AssertExists,
    /// Silently succeed if the path doesn't exist.
    IfExists,
}

impl RemoveAction {
    fn parse(from_target: &str, raw: &str) -> Result<Self, CompilerError> {
        match raw {
            "assert_exists" => Ok(Self::AssertExists),
            "if_exists" => Ok(Self::IfExists),
            other => Err(CompilerError::BadEnum {
                from_target: from_target.to_string(),
                field: "action".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// `RemovePathItem`'s normalized fields.
#[derive(Debug, Clone)]
pub struct RemovePathItem {
    /// Opaque declaration-site identifier, for diagnostics.
    pub from_target: String,
    /// Normalized path to remove.
    pub path: NormalizedPath,
    /// Whether the path must already exist.
    pub action: RemoveAction,
}

/// The action an `RpmActionItem` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpmAction {
    /// Install the named package.
    Install,
    /// Remove the named package if present.
    RemoveIfExists,
}

impl RpmAction {
    fn parse(from_target: &str, raw: &str) -> Result<Self, CompilerError> {
        match raw {
            "install" => Ok(Self::Install),
            "remove_if_exists" => Ok(Self::RemoveIfExists),
            other => Err(CompilerError::BadEnum {
                from_target: from_target.to_string(),
                field: "action".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// `RpmActionItem`'s normalized fields.
#[derive(Debug, Clone)]
pub struct RpmActionItem {
    /// Opaque declaration-site identifier, for diagnostics.
    pub from_target: String,
    /// The RPM package name.
    pub name: String,
    /// Whether to install or remove it.
    pub action: RpmAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_dirs_emits_intermediate_chain() {
        let item = Item::new_make_dirs("t", "/", "a/b/c").unwrap();
        let provides = item.provides();
        let paths: Vec<&str> = provides
            .iter()
            .map(|p| p.path().as_str())
            .collect();
        assert_eq!(paths, vec!["a", "a/b", "a/b/c"]);
    }

    #[test]
    fn make_dirs_requires_into_dir() {
        let item = Item::new_make_dirs("t", "a", "d/e").unwrap();
        let reqs = item.requires();
        assert_eq!(reqs, vec![Requirement::Directory(normalize("t", "a").unwrap())]);
    }

    #[test]
    fn copy_file_with_trailing_slash_dest_uses_source_basename() {
        let item = Item::new_copy_file("t", PathBuf::from("/host/G"), "a/d/e/").unwrap();
        let Item::CopyFile(copy) = item else {
            panic!("expected CopyFile");
        };
        assert_eq!(copy.dest.as_str(), "a/d/e/G");
    }

    #[test]
    fn remove_path_rejects_bad_action() {
        let err = Item::new_remove_path("t", "a/b", "delete_it").unwrap_err();
        assert!(matches!(err, CompilerError::BadEnum { .. }));
    }

    #[test]
    fn remove_path_into_meta_is_rejected_at_construction() {
        let err = Item::new_remove_path("t", "meta/anything", "assert_exists").unwrap_err();
        assert!(matches!(err, CompilerError::ReservedMetaPath { .. }));
    }

    #[test]
    fn rpm_action_phase_depends_on_action() {
        let install = Item::new_rpm_action("t", "mice", "install").unwrap();
        assert_eq!(install.phase_order(), Some(Phase::RpmInstall));
        let remove = Item::new_rpm_action("t", "carrot", "remove_if_exists").unwrap();
        assert_eq!(remove.phase_order(), Some(Phase::RpmRemove));
    }

    #[test]
    fn mount_item_rejects_unknown_keys() {
        let mut config = RawMountConfig {
            is_directory: Some(true),
            build_source: Some(BuildSource {
                source_type: "layer".to_string(),
                source: Some("x".to_string()),
            }),
            ..Default::default()
        };
        config.unknown.insert("bogus".to_string(), serde_json::Value::Null);
        let err = Item::new_mount("t", Some("mnt/data"), config, &[]).unwrap_err();
        assert!(matches!(err, CompilerError::UnknownMountConfig { .. }));
    }

    #[test]
    fn mount_item_host_mount_requires_allowed_prefix() {
        let config = RawMountConfig {
            is_directory: Some(true),
            build_source: Some(BuildSource {
                source_type: "host".to_string(),
                source: Some("/var/x".to_string()),
            }),
            ..Default::default()
        };
        let err =
            Item::new_mount("untrusted//foo", Some("mnt/data"), config.clone(), &["trusted/"])
                .unwrap_err();
        assert!(matches!(err, CompilerError::HostMountDisallowed { .. }));

        let ok = Item::new_mount("trusted/foo", Some("mnt/data"), config, &["trusted/"]).unwrap();
        assert!(matches!(ok, Item::Mount(_)));
    }

    #[test]
    fn runtime_source_host_mount_is_rejected_regardless_of_prefix() {
        let mut config = RawMountConfig {
            is_directory: Some(true),
            build_source: Some(BuildSource {
                source_type: "layer".to_string(),
                source: Some("x".to_string()),
            }),
            ..Default::default()
        };
        config.runtime_source = Some(serde_json::json!({"type": "host", "source": "/etc"}));
        let err = Item::new_mount("trusted/foo", Some("mnt/data"), config, &["trusted/"])
            .unwrap_err();
        assert!(matches!(err, CompilerError::HostMountDisallowed { .. }));
    }

    #[test]
    fn tarball_item_provides_every_entry_under_into_dir() {
        let mut builder = tar::Builder::new(Vec::new());
        let mut dir_header = tar::Header::new_gnu();
        dir_header.set_entry_type(tar::EntryType::Directory);
        dir_header.set_size(0);
        dir_header.set_cksum();
        builder.append_data(&mut dir_header, "sub/", std::io::empty()).unwrap();

        let contents = b"hello";
        let mut file_header = tar::Header::new_gnu();
        file_header.set_size(contents.len() as u64);
        file_header.set_entry_type(tar::EntryType::Regular);
        file_header.set_cksum();
        builder
            .append_data(&mut file_header, "sub/greeting", &contents[..])
            .unwrap();
        let bytes = builder.into_inner().unwrap();

        let tmp = tempfile::Builder::new().suffix(".tar").tempfile().unwrap();
        std::fs::write(tmp.path(), &bytes).unwrap();

        let digest = imgc_schema::Sha256Digest::compute(&bytes);
        let declared = format!("sha256:{digest}");

        let item = Item::new_tarball("t", "into", tmp.path().to_path_buf(), &declared, false)
            .unwrap();
        let Item::Tarball(tarball) = &item else {
            panic!("expected Tarball");
        };
        assert_eq!(tarball.into_dir.as_str(), "into");
        let paths: Vec<&str> = item.provides().iter().map(|p| p.path().as_str()).collect();
        assert_eq!(paths, vec!["into/sub", "into/sub/greeting"]);
        assert_eq!(item.requires(), vec![Requirement::Directory(normalize("t", "into").unwrap())]);
    }

    #[test]
    fn tarball_item_rejects_hash_mismatch() {
        let bytes = tar::Builder::new(Vec::new()).into_inner().unwrap();
        let tmp = tempfile::Builder::new().suffix(".tar").tempfile().unwrap();
        std::fs::write(tmp.path(), &bytes).unwrap();

        let wrong_hash = format!("sha256:{}", "0".repeat(64));
        let err =
            Item::new_tarball("t", "into", tmp.path().to_path_buf(), &wrong_hash, false)
                .unwrap_err();
        assert!(matches!(err, CompilerError::HashMismatch { .. }));
    }

    #[test]
    fn mount_item_provides_do_not_access() {
        let config = RawMountConfig {
            is_directory: Some(true),
            build_source: Some(BuildSource {
                source_type: "layer".to_string(),
                source: Some("x".to_string()),
            }),
            ..Default::default()
        };
        let item = Item::new_mount("t", Some("mnt/data"), config, &[]).unwrap();
        assert_eq!(
            item.provides(),
            vec![Provide::DoNotAccess(normalize("t", "mnt/data").unwrap())]
        );
    }
}

//! Plan manifest (de)serialization (component J, **added**).
//!
//! The distilled specification treats item construction as the caller's
//! job; a complete, buildable crate needs a concrete entry point that turns
//! a file on disk into a `Vec<Item>`. This module parses a TOML manifest of
//! the shape described in `SPEC_FULL.md` §3 ("Manifest item-set format")
//! into the typed item sum type, reusing each `Item::new_*` constructor so
//! manifest-driven and programmatically-constructed items go through
//! exactly the same validation.

use std::collections::HashMap;
use std::path::PathBuf;

use imgc_schema::{BuildSource, RawMountConfig};
use serde::Deserialize;

use crate::error::CompilerError;
use crate::item::Item;
use crate::phases::LayerOpts;

/// Top-level shape of an `imgc.toml` manifest: the layer options consumed
/// by the phase scheduler, plus an ordered item-set.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    /// The `[layer]` table.
    pub layer: RawLayerOpts,
    /// The declarative item set. Declaration order has no compiler meaning
    /// (phases reorder by `Phase`, additive items topologically sort) but
    /// is preserved for default `from_target` diagnostics.
    #[serde(rename = "item", default)]
    pub items: Vec<RawItem>,
}

/// The `[layer]` table: mirrors §6's "Layer options".
#[derive(Debug, Deserialize)]
pub struct RawLayerOpts {
    /// The name of the layer being built, for diagnostics.
    pub layer_target: String,
    /// Build against a `yum` snapshot repo at this path.
    #[serde(default)]
    pub yum_from_snapshot: Option<PathBuf>,
    /// Build inside this build-appliance image.
    #[serde(default)]
    pub build_appliance: Option<PathBuf>,
}

impl From<RawLayerOpts> for LayerOpts {
    fn from(raw: RawLayerOpts) -> Self {
        Self {
            layer_target: raw.layer_target,
            yum_from_snapshot: raw.yum_from_snapshot,
            build_appliance: raw.build_appliance,
        }
    }
}

/// One `[[item]]` table, tagged by its `type` key onto the matching `Item`
/// variant. `from_target` is an optional manifest-level override; when
/// absent, [`parse`] assigns `"item[<index>]"`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawItem {
    /// `FilesystemRootItem`.
    FilesystemRoot {
        /// Declaration-site override for diagnostics.
        #[serde(default)]
        from_target: Option<String>,
    },
    /// `ParentLayerItem`.
    ParentLayer {
        /// Declaration-site override for diagnostics.
        #[serde(default)]
        from_target: Option<String>,
        /// The subvolume to snapshot from.
        source: PathBuf,
    },
    /// `TarballItem`.
    Tarball {
        /// Declaration-site override for diagnostics.
        #[serde(default)]
        from_target: Option<String>,
        /// Where the tarball is extracted to, image-relative.
        into_dir: String,
        /// Host path of the tarball file.
        tarball: PathBuf,
        /// The declared `"algorithm:hex"` content hash.
        hash: String,
        /// Whether extracted entries should be forced to root ownership.
        #[serde(default)]
        force_root_ownership: bool,
    },
    /// `CopyFileItem`.
    CopyFile {
        /// Declaration-site override for diagnostics.
        #[serde(default)]
        from_target: Option<String>,
        /// Host path of the file to copy.
        source: PathBuf,
        /// Destination, rsync-style: a trailing `/` means "into this directory".
        dest: String,
    },
    /// `SymlinkToDirItem`.
    SymlinkToDir {
        /// Declaration-site override for diagnostics.
        #[serde(default)]
        from_target: Option<String>,
        /// The symlink target, expected to be a directory.
        source: String,
        /// Where to place the symlink.
        dest: String,
    },
    /// `SymlinkToFileItem`.
    SymlinkToFile {
        /// Declaration-site override for diagnostics.
        #[serde(default)]
        from_target: Option<String>,
        /// The symlink target, expected to be a non-directory file.
        source: String,
        /// Where to place the symlink.
        dest: String,
    },
    /// `MakeDirsItem`.
    MakeDirs {
        /// Declaration-site override for diagnostics.
        #[serde(default)]
        from_target: Option<String>,
        /// The pre-existing directory `path_to_make` is resolved under.
        into_dir: String,
        /// The chain of intermediate directories to create.
        path_to_make: String,
    },
    /// `MountItem`. Mount-config fields are flattened directly into the
    /// item table, matching `mountconfig.json`'s object shape (§6).
    Mount {
        /// Declaration-site override for diagnostics.
        #[serde(default)]
        from_target: Option<String>,
        /// Explicit mountpoint; falls back to `default_mountpoint` below.
        #[serde(default)]
        mountpoint: Option<String>,
        /// If true, this mount stands in for the build repository's root.
        #[serde(default)]
        is_repo_root: bool,
        /// The mountpoint to use when `mountpoint` above is absent.
        #[serde(default)]
        default_mountpoint: Option<String>,
        /// Whether the mount source is a directory.
        is_directory: Option<bool>,
        /// Where the mount's content is drawn from at build time.
        build_source: Option<BuildSource>,
        /// Opaque runtime-side descriptor, passed through unparsed.
        #[serde(default)]
        runtime_source: Option<serde_json::Value>,
        /// Any keys this table didn't name explicitly.
        #[serde(flatten)]
        unknown: HashMap<String, serde_json::Value>,
    },
    /// `RemovePathItem`.
    RemovePath {
        /// Declaration-site override for diagnostics.
        #[serde(default)]
        from_target: Option<String>,
        /// The path to remove.
        path: String,
        /// `"assert_exists"` or `"if_exists"`.
        action: String,
    },
    /// `RpmActionItem`.
    RpmAction {
        /// Declaration-site override for diagnostics.
        #[serde(default)]
        from_target: Option<String>,
        /// The RPM package name.
        package: String,
        /// `"install"` or `"remove_if_exists"`.
        action: String,
    },
}

/// An error raised while loading a manifest, distinct from [`CompilerError`]
/// since it covers I/O and TOML-syntax failures that happen before any item
/// construction is attempted.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest '{path}': {source}")]
    Io {
        /// The manifest path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The manifest's TOML syntax or shape could not be parsed.
    #[error("failed to parse manifest '{path}': {source}")]
    Parse {
        /// The manifest path that failed to parse.
        path: PathBuf,
        /// The underlying TOML deserialization error.
        #[source]
        source: Box<toml::de::Error>,
    },
    /// An item descriptor failed construction-time validation.
    #[error(transparent)]
    Item(#[from] CompilerError),
}

/// Load and parse a manifest file from disk.
///
/// # Errors
/// Returns [`ManifestError::Io`] if the file cannot be read, or
/// [`ManifestError::Parse`] if its contents are not a valid manifest.
pub fn load(path: &std::path::Path) -> Result<Manifest, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

/// Convert a parsed [`Manifest`] into the typed items and layer options the
/// compiler core operates on.
///
/// `allowed_host_mount_prefixes` is forwarded to every `Mount` item's
/// construction-time policy check (§4.C).
///
/// # Errors
/// Returns [`ManifestError::Item`] wrapping whatever [`CompilerError`] the
/// first invalid item descriptor raises.
pub fn compile(
    manifest: Manifest,
    allowed_host_mount_prefixes: &[&str],
) -> Result<(Vec<Item>, LayerOpts), ManifestError> {
    let mut items = Vec::with_capacity(manifest.items.len());
    for (index, raw) in manifest.items.into_iter().enumerate() {
        items.push(compile_item(index, raw, allowed_host_mount_prefixes)?);
    }
    Ok((items, manifest.layer.into()))
}

fn default_from_target(index: usize, explicit: Option<String>) -> String {
    explicit.unwrap_or_else(|| format!("item[{index}]"))
}

fn compile_item(
    index: usize,
    raw: RawItem,
    allowed_host_mount_prefixes: &[&str],
) -> Result<Item, ManifestError> {
    let item = match raw {
        RawItem::FilesystemRoot { from_target } => {
            Item::new_filesystem_root(default_from_target(index, from_target))
        }
        RawItem::ParentLayer { from_target, source } => {
            Item::new_parent_layer(default_from_target(index, from_target), source)
        }
        RawItem::Tarball {
            from_target,
            into_dir,
            tarball,
            hash,
            force_root_ownership,
        } => Item::new_tarball(
            default_from_target(index, from_target),
            &into_dir,
            tarball,
            &hash,
            force_root_ownership,
        )?,
        RawItem::CopyFile {
            from_target,
            source,
            dest,
        } => Item::new_copy_file(default_from_target(index, from_target), source, &dest)?,
        RawItem::SymlinkToDir {
            from_target,
            source,
            dest,
        } => Item::new_symlink_to_dir(default_from_target(index, from_target), &source, &dest)?,
        RawItem::SymlinkToFile {
            from_target,
            source,
            dest,
        } => Item::new_symlink_to_file(default_from_target(index, from_target), &source, &dest)?,
        RawItem::MakeDirs {
            from_target,
            into_dir,
            path_to_make,
        } => Item::new_make_dirs(default_from_target(index, from_target), &into_dir, &path_to_make)?,
        RawItem::Mount {
            from_target,
            mountpoint,
            is_repo_root,
            default_mountpoint,
            is_directory,
            build_source,
            runtime_source,
            unknown,
        } => {
            let from_target = default_from_target(index, from_target);
            let config = RawMountConfig {
                is_repo_root,
                default_mountpoint,
                is_directory,
                build_source,
                runtime_source,
                unknown,
            };
            Item::new_mount(
                from_target,
                mountpoint.as_deref(),
                config,
                allowed_host_mount_prefixes,
            )?
        }
        RawItem::RemovePath {
            from_target,
            path,
            action,
        } => Item::new_remove_path(default_from_target(index, from_target), &path, &action)?,
        RawItem::RpmAction {
            from_target,
            package,
            action,
        } => Item::new_rpm_action(default_from_target(index, from_target), &package, &action)?,
    };
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> Manifest {
        toml::from_str(toml_text).unwrap()
    }

    #[test]
    fn parses_scenario_one_manifest() {
        let manifest = parse(
            r#"
            [layer]
            layer_target = "demo"
            yum_from_snapshot = "/snapshot"

            [[item]]
            type = "filesystem_root"

            [[item]]
            type = "make_dirs"
            into_dir = "/"
            path_to_make = "a/b/c"

            [[item]]
            type = "copy_file"
            source = "/host/x"
            dest = "a/b/c/F"
            "#,
        );
        let (items, opts) = compile(manifest, &[]).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(opts.layer_target, "demo");
        assert_eq!(items[1].from_target(), "item[1]");
    }

    #[test]
    fn explicit_from_target_overrides_default() {
        let manifest = parse(
            r#"
            [layer]
            layer_target = "demo"
            build_appliance = "/ba"

            [[item]]
            type = "filesystem_root"
            from_target = "//my:root"
            "#,
        );
        let (items, _) = compile(manifest, &[]).unwrap();
        assert_eq!(items[0].from_target(), "//my:root");
    }

    #[test]
    fn bad_action_surfaces_as_manifest_item_error() {
        let manifest = parse(
            r#"
            [layer]
            layer_target = "demo"
            build_appliance = "/ba"

            [[item]]
            type = "remove_path"
            path = "a/b"
            action = "delete_it"
            "#,
        );
        let err = compile(manifest, &[]).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Item(CompilerError::BadEnum { .. })
        ));
    }

    #[test]
    fn rejects_unknown_mount_keys() {
        let manifest = parse(
            r#"
            [layer]
            layer_target = "demo"
            build_appliance = "/ba"

            [[item]]
            type = "mount"
            mountpoint = "mnt/data"
            is_directory = true
            bogus = "nope"
            build_source = { type = "layer", source = "x" }
            "#,
        );
        let err = compile(manifest, &[]).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Item(CompilerError::UnknownMountConfig { .. })
        ));
    }

    #[test]
    fn mount_with_only_known_keys_compiles() {
        let manifest = parse(
            r#"
            [layer]
            layer_target = "demo"
            build_appliance = "/ba"

            [[item]]
            type = "mount"
            mountpoint = "mnt/data"
            is_directory = true
            build_source = { type = "layer", source = "x" }
            "#,
        );
        let (items, _) = compile(manifest, &[]).unwrap();
        assert_eq!(items.len(), 1);
    }
}

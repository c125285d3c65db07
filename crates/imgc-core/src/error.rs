//! The compiler's error taxonomy (component I).
//!
//! Every fallible operation in the core returns [`CompilerError`]. All
//! variants are fatal to the current build; none are retried, and every one
//! carries enough context (`from_target`, offending paths) for the plan
//! driver to log a useful diagnostic before giving up.

use imgc_schema::{NormalizedPath, PathError};
use thiserror::Error;

/// A fatal error raised anywhere in the compiler core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilerError {
    /// Path escapes the image root or is `..`-prefixed.
    #[error("[{from_target}] illegal path '{path}': escapes the image root")]
    IllegalPath {
        /// The declaration site that produced the offending path.
        from_target: String,
        /// The raw path string as given by the caller.
        path: String,
    },

    /// Path collides with the reserved `meta/` directory.
    #[error("[{from_target}] path '{path}' collides with the reserved 'meta/' directory")]
    ReservedMetaPath {
        /// The declaration site that produced the offending path.
        from_target: String,
        /// The raw path string as given by the caller.
        path: String,
    },

    /// Unknown action or phase value during item construction.
    #[error("[{from_target}] unknown value '{value}' for field '{field}'")]
    BadEnum {
        /// The declaration site that produced the offending value.
        from_target: String,
        /// The field name the value was rejected for.
        field: String,
        /// The raw, unrecognized value.
        value: String,
    },

    /// `TarballItem`'s computed content hash doesn't match its declared hash.
    #[error("[{from_target}] tarball hash mismatch: declared {expected}, computed {actual}")]
    HashMismatch {
        /// The declaration site of the `TarballItem`.
        from_target: String,
        /// The declared `"algorithm:hex"` digest.
        expected: String,
        /// The digest actually computed from the tarball's bytes.
        actual: String,
    },

    /// `mountconfig.json` has keys the compiler doesn't recognize.
    #[error("[{from_target}] unrecognized keys in mount config: {keys:?}")]
    UnknownMountConfig {
        /// The declaration site of the `MountItem`.
        from_target: String,
        /// The leftover, unrecognized keys.
        keys: Vec<String>,
    },

    /// A host-type mount was declared outside a permitted declaration site.
    #[error("[{from_target}] host mounts are not permitted at this declaration site")]
    HostMountDisallowed {
        /// The declaration site of the offending `MountItem`.
        from_target: String,
    },

    /// Zero or more than one `PARENT_LAYER` item was found in the item set.
    #[error("expected exactly one PARENT_LAYER item, found {found}")]
    AmbiguousParent {
        /// How many `PARENT_LAYER` items were actually present.
        found: usize,
    },

    /// A single item emitted two provides for the same path.
    #[error("[{from_target}] item provides path '{path}' more than once")]
    SamePathInItem {
        /// The declaration site of the offending item.
        from_target: String,
        /// The path claimed twice.
        path: NormalizedPath,
    },

    /// Two different items both provide the same path.
    #[error(
        "path '{path}' is provided by more than one item ('{first_target}' and '{second_target}')"
    )]
    DuplicateProvide {
        /// The path claimed by both items.
        path: NormalizedPath,
        /// The declaration site of whichever item claimed it first.
        first_target: String,
        /// The declaration site of the conflicting, later item.
        second_target: String,
    },

    /// A requirement has no matching provide anywhere in the build.
    #[error("[{from_target}] requirement on '{path}' has no matching provide")]
    UnmetRequirement {
        /// The declaration site of the item holding the requirement.
        from_target: String,
        /// The required path.
        path: NormalizedPath,
    },

    /// A requirement's path is shadowed by a `ProvidesDoNotAccess` claim.
    #[error("[{from_target}] requirement on '{path}' falls inside a protected path")]
    RequiresProtected {
        /// The declaration site of the item holding the requirement.
        from_target: String,
        /// The required, now-protected path.
        path: NormalizedPath,
    },

    /// The dependency graph of additive items contains a cycle.
    #[error("dependency graph has a cycle among items from: {targets:?}")]
    Cycle {
        /// Declaration sites of the items still unresolved when emission got stuck.
        targets: Vec<String>,
    },

    /// An additive item's primary output path is inside a protected path.
    #[error("[{from_target}] output path '{path}' is inside a protected path")]
    WriteIntoProtected {
        /// The declaration site of the offending item.
        from_target: String,
        /// The protected output path.
        path: NormalizedPath,
    },

    /// Two `RpmActionItem`s name conflicting actions for the same package
    /// within one layer.
    #[error(
        "package '{package}' has conflicting actions in one layer ('{first_target}' and '{second_target}')"
    )]
    RpmActionConflict {
        /// The conflicting package name.
        package: String,
        /// The declaration site of the first action.
        first_target: String,
        /// The declaration site of the conflicting action.
        second_target: String,
    },

    /// Layer options set neither or both of `yum_from_snapshot` / `build_appliance`.
    #[error("layer options must set exactly one of yum_from_snapshot / build_appliance")]
    BadLayerOpts,

    /// The subvolume driver detected a symlink escaping the subvolume.
    #[error("subvolume primitive detected a symlink escape at '{path}'")]
    PathEscape {
        /// The path whose resolution escaped the subvolume.
        path: String,
    },

    /// An external collaborator (subvolume or package-manager driver) failed.
    /// Surfaced unchanged, per the propagation rule in the error handling
    /// design.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl CompilerError {
    /// Lift a [`PathError`] raised while normalizing a path into the
    /// corresponding `CompilerError` variant, attaching the declaration site.
    pub fn from_path_error(from_target: impl Into<String>, err: PathError) -> Self {
        let from_target = from_target.into();
        match err {
            PathError::IllegalPath(path) => Self::IllegalPath { from_target, path },
            PathError::ReservedMetaPath(path) => Self::ReservedMetaPath { from_target, path },
        }
    }

    /// Log this error at `error` level with its structured fields, as the
    /// plan driver does immediately before giving up on a build.
    pub fn log(&self) {
        tracing::error!(kind = self.kind(), "{self}");
    }

    /// A short, stable tag naming which taxonomy row this error belongs to,
    /// used as a structured logging field.
    fn kind(&self) -> &'static str {
        match self {
            Self::IllegalPath { .. } => "illegal_path",
            Self::ReservedMetaPath { .. } => "reserved_meta_path",
            Self::BadEnum { .. } => "bad_enum",
            Self::HashMismatch { .. } => "hash_mismatch",
            Self::UnknownMountConfig { .. } => "unknown_mount_config",
            Self::HostMountDisallowed { .. } => "host_mount_disallowed",
            Self::AmbiguousParent { .. } => "ambiguous_parent",
            Self::SamePathInItem { .. } => "same_path_in_item",
            Self::DuplicateProvide { .. } => "duplicate_provide",
            Self::UnmetRequirement { .. } => "unmet_requirement",
            Self::RequiresProtected { .. } => "requires_protected",
            Self::Cycle { .. } => "cycle",
            Self::WriteIntoProtected { .. } => "write_into_protected",
            Self::RpmActionConflict { .. } => "rpm_action_conflict",
            Self::BadLayerOpts => "bad_layer_opts",
            Self::PathEscape { .. } => "path_escape",
            Self::Driver(_) => "driver",
        }
    }
}

/// An error surfaced by a [`crate::subvol::SubvolumeDriver`] or
/// [`crate::rpm::RpmDriver`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The subvolume driver failed to perform a requested operation.
    #[error("subvolume driver: {0}")]
    Subvolume(String),
    /// The package-manager driver failed to apply an install/remove bucket.
    #[error("rpm driver: {0}")]
    Rpm(String),
}

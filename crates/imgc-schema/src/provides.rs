//! The provides/requires model (component B): typed, path-scoped claims
//! about the filesystem namespace an item set builds.

use crate::path::NormalizedPath;
use std::fmt;

/// A claim a built item makes about a resulting filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provide {
    /// A directory exists at this path.
    Directory(NormalizedPath),
    /// A non-directory inode exists at this path.
    File(NormalizedPath),
    /// This path is reserved: no other item may provide or require inside
    /// it (e.g. `meta/`, or an active mountpoint).
    DoNotAccess(NormalizedPath),
}

impl Provide {
    /// The path this provide is about, regardless of variant.
    pub fn path(&self) -> &NormalizedPath {
        match self {
            Self::Directory(p) | Self::File(p) | Self::DoNotAccess(p) => p,
        }
    }
}

impl fmt::Display for Provide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(p) => write!(f, "ProvidesDirectory({p})"),
            Self::File(p) => write!(f, "ProvidesFile({p})"),
            Self::DoNotAccess(p) => write!(f, "ProvidesDoNotAccess({p})"),
        }
    }
}

/// A claim a candidate item makes about the filesystem it needs to
/// pre-exist before it can build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// A directory must exist at this path.
    Directory(NormalizedPath),
    /// A non-directory inode must exist at this path.
    File(NormalizedPath),
}

impl Requirement {
    /// The path this requirement is about, regardless of variant.
    pub fn path(&self) -> &NormalizedPath {
        match self {
            Self::Directory(p) | Self::File(p) => p,
        }
    }

    /// Does `provide` satisfy this requirement? True iff the paths are
    /// equal and the variants are compatible: `Directory` only matches
    /// `Provide::Directory`, `File` only matches `Provide::File`.
    /// `Provide::DoNotAccess` never satisfies any requirement — callers
    /// must treat it as a conflict (see `RequiresProtected` in
    /// `imgc-core`'s validator), not as a silent non-match.
    pub fn is_satisfied_by(&self, provide: &Provide) -> bool {
        if self.path() != provide.path() {
            return false;
        }
        matches!(
            (self, provide),
            (Self::Directory(_), Provide::Directory(_)) | (Self::File(_), Provide::File(_))
        )
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(p) => write!(f, "require_directory({p})"),
            Self::File(p) => write!(f, "require_file({p})"),
        }
    }
}

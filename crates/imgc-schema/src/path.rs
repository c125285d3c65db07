//! Image-relative path normalization (component A of the compiler).
//!
//! Every path an item mentions — a `provides()`, a `requires()`, a
//! mountpoint — is normalized through [`normalize_image_relative`] exactly
//! once, at item-construction time. The result is a [`NormalizedPath`]: a
//! validated newtype so the rest of the compiler never has to re-check that
//! a path is relative, `..`-free, and outside the reserved `meta/` tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The reserved directory that records image build metadata. Regular items
/// may never provide or require a path inside it.
///
/// The trailing slash is significant: it marks `meta/` as a protected
/// *directory* rather than a protected *file* (see [`crate::phase::Phase`]
/// and the protected-path tracker in `imgc-core`).
pub const META_DIR: &str = "meta/";

/// A path that has passed through [`normalize_image_relative`]: relative,
/// `..`-free, and not inside `meta/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    /// Borrow the normalized path as a `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The parent directory of this path, normalized the same way `self`
    /// was (empty string becomes `.`, matching `dirname` semantics used by
    /// `CopyFileItem`/`SymlinkItem` for their directory requirement).
    pub fn dirname(&self) -> NormalizedPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) if !parent.is_empty() => NormalizedPath(parent.to_string()),
            _ => NormalizedPath(String::new()),
        }
    }

    /// Join a child path segment onto this one.
    pub fn join(&self, child: &str) -> String {
        if self.0.is_empty() {
            child.to_string()
        } else {
            format!("{}/{}", self.0, child)
        }
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors raised while normalizing a path.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path escapes the image root (resolves to `..` or starts with
    /// `../` after collapsing `.`/`..` components).
    #[error("path '{0}' escapes the image root")]
    IllegalPath(String),
    /// The path collides with the reserved `meta/` directory.
    #[error("path '{0}' collides with the reserved '{META_DIR}' directory")]
    ReservedMetaPath(String),
}

/// Collapse `.`/`..` components and strip a leading `/`, then reject paths
/// that escape the image root or collide with `meta/`.
///
/// Absolute inputs are treated as image-relative (the leading `/` is
/// stripped), matching the original's `lstrip('/')` convention for
/// caller convenience.
///
/// # Errors
///
/// Returns [`PathError::IllegalPath`] if the normalized result is `..` or
/// starts with `../`. Returns [`PathError::ReservedMetaPath`] if the
/// normalized result (with a trailing `/` appended) starts with `meta/`.
pub fn normalize_image_relative(raw: &str) -> Result<NormalizedPath, PathError> {
    let collapsed = collapse_dot_components(raw.trim_start_matches('/'));
    if collapsed == ".." || collapsed.starts_with("../") {
        return Err(PathError::IllegalPath(raw.to_string()));
    }
    let with_trailing_slash = format!("{collapsed}/");
    if with_trailing_slash.starts_with(META_DIR) {
        return Err(PathError::ReservedMetaPath(raw.to_string()));
    }
    Ok(NormalizedPath(collapsed))
}

/// The normalized form of the reserved `meta/` directory itself.
///
/// [`normalize_image_relative`] always rejects `meta` (it collides with
/// itself), so callers that need to register it as a protected path — the
/// protected-path tracker always includes it — go through this constructor
/// instead.
pub fn meta_dir() -> NormalizedPath {
    NormalizedPath(META_DIR.trim_end_matches('/').to_string())
}

/// Apply the rsync destination convention before normalizing: if `dest`
/// ends in `/`, the file named by `source`'s last path segment is appended,
/// so `dest = "/foo/"` means "copy into the directory `/foo`" rather than
/// "copy to a file literally named `foo`".
///
/// # Errors
///
/// Propagates [`normalize_image_relative`]'s errors on the resulting path.
pub fn rsync_dest(dest: &str, source: &str) -> Result<NormalizedPath, PathError> {
    if let Some(stripped) = dest.strip_suffix('/') {
        let basename = source.rsplit('/').next().unwrap_or(source);
        let joined = if stripped.is_empty() {
            basename.to_string()
        } else {
            format!("{stripped}/{basename}")
        };
        normalize_image_relative(&joined)
    } else {
        normalize_image_relative(dest)
    }
}

/// `std::path`-style `.`/`..` collapsing over a `/`-separated string,
/// without touching the filesystem (mirrors Python's `os.path.normpath`
/// applied to an already-relative path). The image root normalizes to the
/// empty string, matching [`NormalizedPath::dirname`]'s convention for a
/// top-level path's parent.
fn collapse_dot_components(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                match stack.last() {
                    Some(&top) if top != ".." => {
                        stack.pop();
                    }
                    _ => stack.push(".."),
                }
            }
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        String::new()
    } else {
        stack.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_slash() {
        assert_eq!(normalize_image_relative("/a/b").unwrap().as_str(), "a/b");
    }

    #[test]
    fn collapses_dot_components() {
        assert_eq!(
            normalize_image_relative("a/./b/../c").unwrap().as_str(),
            "a/c"
        );
    }

    #[test]
    fn rejects_traversal_above_root() {
        assert!(matches!(
            normalize_image_relative("../etc/passwd"),
            Err(PathError::IllegalPath(_))
        ));
        assert!(matches!(
            normalize_image_relative("a/../../etc"),
            Err(PathError::IllegalPath(_))
        ));
    }

    #[test]
    fn rejects_meta_dir() {
        assert!(matches!(
            normalize_image_relative("meta/anything"),
            Err(PathError::ReservedMetaPath(_))
        ));
        assert!(matches!(
            normalize_image_relative("/meta/"),
            Err(PathError::ReservedMetaPath(_))
        ));
    }

    #[test]
    fn normalization_is_idempotent() {
        for p in ["/a/b/c", "a/./b", "x/y/z", "/"] {
            let once = normalize_image_relative(p).unwrap();
            let twice = normalize_image_relative(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn rsync_dest_with_trailing_slash_appends_basename() {
        assert_eq!(rsync_dest("a/d/e/", "G").unwrap().as_str(), "a/d/e/G");
        assert_eq!(
            rsync_dest("a/d/e/", "/host/path/G").unwrap().as_str(),
            "a/d/e/G"
        );
    }

    #[test]
    fn rsync_dest_without_trailing_slash_is_literal() {
        assert_eq!(
            rsync_dest("a/b/c/F", "x").unwrap().as_str(),
            "a/b/c/F"
        );
    }

    #[test]
    fn meta_dir_helper_bypasses_the_rejection_it_exists_to_avoid() {
        assert_eq!(meta_dir().as_str(), "meta");
        assert!(normalize_image_relative("meta").is_err());
    }

    #[test]
    fn dirname_of_top_level_path_is_empty() {
        let p = normalize_image_relative("F").unwrap();
        assert_eq!(p.dirname().as_str(), "");
    }

    #[test]
    fn root_normalizes_the_same_way_regardless_of_spelling() {
        // "/" and "" and "." must all normalize to the same representation
        // `dirname()` uses for a top-level path's parent, or the seed
        // provide for a freshly created root and a `require_directory("/")`
        // from a top-level item would never match in the validator's map.
        for root_spelling in ["/", "", "."] {
            assert_eq!(normalize_image_relative(root_spelling).unwrap().as_str(), "");
        }
        let top_level = normalize_image_relative("F").unwrap();
        assert_eq!(top_level.dirname().as_str(), "");
    }
}

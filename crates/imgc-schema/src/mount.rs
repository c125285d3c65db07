//! Wire format for `mountconfig.json` (§6 "Mount config file format") and
//! the serialized mount metadata the protected-path tracker reads back from
//! `meta/private/mount/<mountpoint>/MOUNT/` (§6 "Mount metadata layout").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a mount's content comes from at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSource {
    /// The kind of source: `"layer"`, `"host"`, or similar.
    #[serde(rename = "type")]
    pub source_type: String,
    /// The source path or target, or `None` when `is_repo_root` fills it in.
    pub source: Option<String>,
}

/// The raw, as-parsed shape of `mountconfig.json`. Every field the compiler
/// recognizes is listed explicitly; any other key is rejected as
/// `UnknownMountConfig` by the caller once it has popped these known keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMountConfig {
    /// If true, this mount stands in for the build repository's root.
    #[serde(default)]
    pub is_repo_root: bool,
    /// The mountpoint to use when the item doesn't supply one explicitly.
    #[serde(default)]
    pub default_mountpoint: Option<String>,
    /// Whether the mount source is a directory (vs. a single file/device).
    pub is_directory: Option<bool>,
    /// Where the mount's content is drawn from at build time.
    pub build_source: Option<BuildSource>,
    /// Opaque runtime-side descriptor, passed through unparsed.
    #[serde(default)]
    pub runtime_source: Option<serde_json::Value>,
    /// Any keys this struct didn't name explicitly; must be empty once the
    /// known fields above are accounted for, or construction fails with
    /// `UnknownMountConfig`.
    #[serde(flatten)]
    pub unknown: HashMap<String, serde_json::Value>,
}

/// The three fields recorded per-mountpoint under
/// `meta/private/mount/<mountpoint>/MOUNT/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountMetadata {
    /// Whether the mount source is a directory.
    pub is_directory: bool,
    /// The build-time source descriptor.
    pub build_source: BuildSource,
    /// The opaque runtime-side descriptor.
    pub runtime_source: serde_json::Value,
}

//! Shared types and wire format for the image compiler.
//!
//! This crate defines the vocabulary every other compiler component builds
//! on: normalized image-relative paths, the provides/requires contract
//! additive items publish, the fixed phase ordering black-box items run
//! under, content-hash wrappers for tarball verification, and the
//! `mountconfig.json` wire format `MountItem` parses.

/// Typed wrappers for cryptographic hashes (SHA-256, BLAKE3).
pub mod hash;
/// `mountconfig.json` wire format and mount metadata.
pub mod mount;
/// Image-relative path normalization.
pub mod path;
/// The fixed ordinal enumeration of black-box build phases.
pub mod phase;
/// The provides/requires model additive items publish and consume.
pub mod provides;

pub use hash::{Blake3Digest, Digest, DigestParseError, Sha256Digest};
pub use mount::{BuildSource, MountMetadata, RawMountConfig};
pub use path::{meta_dir, normalize_image_relative, rsync_dest, NormalizedPath, PathError, META_DIR};
pub use phase::Phase;
pub use provides::{Provide, Requirement};

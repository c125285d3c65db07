//! The protected-path tracker (component G).
//!
//! Protected paths are recomputed at each phase boundary from the *current*
//! subvolume state — there is no core-level global mutable state (§9). The
//! set always includes the reserved `meta/` directory, plus every active
//! mountpoint the subvolume driver currently reports.

use imgc_schema::{meta_dir, NormalizedPath};

use crate::error::DriverError;
use crate::subvol::SubvolumeDriver;

/// Compute the current protected-path set: `meta/` plus every active
/// mountpoint.
///
/// # Errors
/// Propagates [`DriverError`] if the subvolume's mount metadata tree cannot
/// be read.
pub fn compute_protected(subvol: &dyn SubvolumeDriver) -> Result<Vec<NormalizedPath>, DriverError> {
    let mut protected = vec![meta_dir()];
    protected.extend(subvol.mountpoints()?);
    Ok(protected)
}

/// Does `path` fall inside any protected path in `protected`?
///
/// Every entry in `protected` denotes a directory (trailing-slash
/// semantics): `is_protected("x/y/z", ["x/y"])` is true because `x/y/z/`
/// starts with `x/y/`; `is_protected("x/yy", ["x/y"])` is false.
pub fn is_protected(path: &NormalizedPath, protected: &[NormalizedPath]) -> bool {
    let candidate = format!("{}/", path.as_str());
    protected
        .iter()
        .any(|prot| candidate.starts_with(&format!("{}/", prot.as_str())))
}

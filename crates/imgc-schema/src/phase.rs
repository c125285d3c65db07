//! The fixed ordinal enumeration of black-box build phases.

use serde::{Deserialize, Serialize};

/// Coarse, black-box stages executed atomically and strictly in this
/// ordinal order, before any additive item builds. Derived `Ord` gives the
/// fixed ordering the phase scheduler (component D) relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Creates the subvolume itself (fresh root or parent-layer snapshot).
    /// Must precede every other phase.
    ParentLayer,
    /// Precedes `RpmInstall` somewhat arbitrarily (install/remove conflicts
    /// within one layer are rejected regardless), and precedes
    /// `RemovePaths` so that path removals never race RPM scriptlets.
    RpmRemove,
    /// RPM installation, after all removes.
    RpmInstall,
    /// Must be the last phase: it is allowed to remove paths that
    /// `RpmInstall` itself created, and the dependency sorter has no way to
    /// "undo" something a regular item provides.
    RemovePaths,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_strictly_ordered() {
        assert!(Phase::ParentLayer < Phase::RpmRemove);
        assert!(Phase::RpmRemove < Phase::RpmInstall);
        assert!(Phase::RpmInstall < Phase::RemovePaths);
    }
}

//! The package-manager driver interface (component 4.J).
//!
//! Invoked once per non-empty `{install, remove_if_exists}` bucket, with the
//! sorted package names, the install root, and the current protected-path
//! list. A real implementation shells out to `yum`/`dnf`; the core only
//! depends on the trait, and drives its own tests against [`FakeRpmDriver`].

use imgc_schema::NormalizedPath;
use std::path::Path;

use crate::error::DriverError;

/// The operation the compiler core needs from a package-manager driver.
pub trait RpmDriver {
    /// Apply one bucket of package actions. `install` and `remove` are
    /// already sorted by the phase factory that calls this. Must be
    /// deterministic given sorted input.
    ///
    /// # Errors
    /// Returns [`DriverError::Rpm`] if the underlying package manager fails.
    fn apply(
        &mut self,
        install: &[String],
        remove: &[String],
        install_root: &Path,
        protected: &[NormalizedPath],
    ) -> Result<(), DriverError>;
}

/// An in-memory [`RpmDriver`] for the core's own test suite. Records every
/// call it receives instead of invoking a real package manager.
#[derive(Debug, Default)]
pub struct FakeRpmDriver {
    calls: Vec<FakeRpmCall>,
}

/// One recorded invocation of [`FakeRpmDriver::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRpmCall {
    /// Packages requested for install, in the order the phase factory passed them.
    pub install: Vec<String>,
    /// Packages requested for removal, in the order the phase factory passed them.
    pub remove: Vec<String>,
}

impl FakeRpmDriver {
    /// Construct a fake driver with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far, in call order.
    pub fn calls(&self) -> &[FakeRpmCall] {
        &self.calls
    }
}

impl RpmDriver for FakeRpmDriver {
    fn apply(
        &mut self,
        install: &[String],
        remove: &[String],
        _install_root: &Path,
        _protected: &[NormalizedPath],
    ) -> Result<(), DriverError> {
        self.calls.push(FakeRpmCall {
            install: install.to_vec(),
            remove: remove.to_vec(),
        });
        Ok(())
    }
}

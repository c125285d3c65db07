//! Compiler core for the declarative image-item build system.
//!
//! Takes an unordered set of [`item::Item`]s and produces a correct,
//! deterministic build plan: a fixed-order sequence of black-box **phase**
//! builders ([`phases`]), followed by the **additive** items in a
//! dependency order derived from their provides/requires contract
//! ([`validator`], [`graph`]). [`driver`] ties the pieces together into the
//! orchestration the thin CLI (`imgc-cli`) drives.
//!
//! The core is single-threaded and synchronous: no operation here blocks on
//! I/O except tarball hashing and mount-config parsing, both performed once
//! at item construction ([`item::Item::new_tarball`],
//! [`item::Item::new_mount`]).

/// The plan driver (component H): orchestrates the validator, dependency
/// graph, and protected-path tracker into a build order for additive items.
pub mod driver;
/// The compiler's error taxonomy (component I) and the smaller
/// [`error::DriverError`] external collaborators return.
pub mod error;
/// The dependency graph (component F): predecessor derivation and
/// topological emission over additive items.
pub mod graph;
/// The item model (component C): a closed sum type of image items.
pub mod item;
/// Plan manifest (de)serialization (component J): parses a declarative TOML
/// item-set into the typed [`item::Item`] sum type.
pub mod manifest;
/// The phase scheduler (component D): partitions items by phase and emits
/// phase builders in fixed ordinal order.
pub mod phases;
/// The protected-path tracker (component G).
pub mod protected;
/// The package-manager driver interface (component 4.J) and its in-memory
/// test double.
pub mod rpm;
/// The copy-on-write subvolume driver interface (component 4.I) and its
/// in-memory test double.
pub mod subvol;
/// The reqs/provs validator (component E).
pub mod validator;

pub use driver::{additive_build_order, check_write_allowed};
pub use error::{CompilerError, DriverError};
pub use item::Item;
pub use phases::{schedule_phases, LayerOpts, PhaseBuilder, PhaseContext};
pub use rpm::{FakeRpmDriver, RpmDriver};
pub use subvol::{EntryKind, FakeSubvolume, SubvolumeDriver};

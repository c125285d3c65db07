//! The plan driver (component H): orchestrates components A-G into the full
//! build plan.
//!
//! Phase builders are scheduled (4.D) and handed back to the caller to
//! execute against the subvolume — the driver itself never runs them. Once
//! the caller reports the phases have run, [`additive_build_order`] builds
//! the validator (4.E) and dependency graph (4.F) against the subvolume's
//! now-current state and emits the additive items in topological order.
//! [`check_write_allowed`] is the 4.H step 4 re-check: the caller calls it
//! immediately before handing each emitted item to its builder, so a
//! protected path that only came into existence partway through the
//! additive sequence (a `MountItem` whose build just registered its
//! metadata) still blocks whatever comes after it.

use imgc_schema::Provide;

use crate::error::CompilerError;
use crate::graph::DependencyGraph;
use crate::item::Item;
use crate::protected::{compute_protected, is_protected};
use crate::subvol::{EntryKind, SubvolumeDriver};
use crate::validator::{validate, AdditiveClaims, SeedProvide};

/// Resolve the additive items of `items` into a dependency-respecting build
/// order, once every phase builder [`crate::phases::schedule_phases`] emitted
/// has run against `subvol`.
///
/// Seeds the provides map from `subvol.existing_entries()` — everything the
/// `PARENT_LAYER` phase actually put in place — plus the current
/// protected-path set (4.G) as `ProvidesDoNotAccess`, matching
/// `ParentLayerItem`'s documented behavior of providing every non-protected
/// entry while protected paths provide `DoNotAccess`. Returns each additive
/// item's index into `items` (phase items are excluded), in build order.
///
/// # Errors
/// Propagates every `CompilerError` the validator (E) or dependency graph
/// (F) can raise, including `RequiresProtected` for a requirement that lands
/// exactly on a protected path.
pub fn additive_build_order(
    items: &[Item],
    subvol: &dyn SubvolumeDriver,
) -> Result<Vec<usize>, CompilerError> {
    let additive: Vec<(usize, &Item)> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.phase_order().is_none())
        .collect();

    let claims: Vec<AdditiveClaims> = additive
        .iter()
        .map(|(_, item)| AdditiveClaims {
            from_target: item.from_target().to_string(),
            provides: item.provides(),
            requires: item.requires(),
        })
        .collect();

    let protected = compute_protected(subvol).map_err(CompilerError::from)?;
    let mut seed: Vec<SeedProvide> = protected
        .iter()
        .map(|p| SeedProvide {
            provide: Provide::DoNotAccess(p.clone()),
        })
        .collect();
    for (kind, path) in subvol.existing_entries().map_err(CompilerError::from)? {
        if is_protected(&path, &protected) {
            continue;
        }
        seed.push(SeedProvide {
            provide: match kind {
                EntryKind::Directory => Provide::Directory(path),
                EntryKind::File => Provide::File(path),
            },
        });
    }

    let map = validate(&claims, &seed)?;
    let requires_by_item: Vec<_> = claims.iter().map(|c| c.requires.clone()).collect();
    let from_targets: Vec<String> = claims.iter().map(|c| c.from_target.clone()).collect();
    let graph = DependencyGraph::build(additive.len(), &requires_by_item, &map);
    let local_order = graph.topological_order(&from_targets)?;

    Ok(local_order
        .into_iter()
        .map(|local_idx| additive[local_idx].0)
        .collect())
}

/// 4.H step 4: re-consult the protected-path tracker against `subvol`'s
/// *current* state and fail if `item`'s primary output path now falls
/// inside a protected path.
///
/// Called by the caller immediately before applying each item
/// [`additive_build_order`] emitted — fresh per call, not cached from the
/// order computation, since a `MountItem` earlier in the same order may have
/// registered a new protected path by the time a later item's turn comes up.
///
/// # Errors
/// Returns [`CompilerError::WriteIntoProtected`] if `item`'s primary output
/// path is protected. Propagates [`CompilerError::Driver`] if the tracker
/// can't read the subvolume's mount metadata.
pub fn check_write_allowed(item: &Item, subvol: &dyn SubvolumeDriver) -> Result<(), CompilerError> {
    let Some(output) = item.primary_output() else {
        return Ok(());
    };
    let protected = compute_protected(subvol).map_err(CompilerError::from)?;
    if is_protected(output, &protected) {
        return Err(CompilerError::WriteIntoProtected {
            from_target: item.from_target().to_string(),
            path: output.clone(),
        });
    }
    Ok(())
}

//! The reqs/provs validator (component E).
//!
//! Builds a mapping `path -> (provides, requires)` over the union of every
//! additive item's `provides()`/`requires()`, plus whatever the subvolume
//! already had in place once the `PARENT_LAYER` phase ran. The resulting
//! map is what the dependency graph (F) derives predecessor edges from.

use std::collections::HashMap;

use imgc_schema::{Provide, Requirement};

use crate::error::CompilerError;

/// A provide already claimed for a path, and which additive item (if any)
/// claimed it. `None` means the claim predates any additive item — it came
/// from the subvolume's existing contents after the parent-layer phase.
#[derive(Debug, Clone)]
pub struct ProvideClaim {
    /// The provide itself.
    pub provide: Provide,
    /// Index into the additive item slice that made this claim, or `None`
    /// if it was seeded from the subvolume's pre-existing state.
    pub owner: Option<usize>,
    /// The owning item's `from_target`, or a sentinel for seeded claims.
    pub from_target: String,
}

/// One path's accumulated claims.
#[derive(Debug, Clone, Default)]
pub struct PathClaims {
    /// The single provide claiming this path, once validated.
    pub provide: Option<ProvideClaim>,
    /// Every `(item index, from_target)` that requires this path.
    pub requirers: Vec<(usize, Requirement, String)>,
}

/// The validated path -> claims map.
pub type ValidatedMap = HashMap<String, PathClaims>;

/// One additive item's contribution to the validator, keyed by its position
/// in the slice passed to [`validate`] — that position is the item index
/// the dependency graph (F) uses.
pub struct AdditiveClaims {
    /// The item's `from_target`, for diagnostics.
    pub from_target: String,
    /// The item's `provides()`.
    pub provides: Vec<Provide>,
    /// The item's `requires()`.
    pub requires: Vec<Requirement>,
}

/// A provide already present before any additive item runs — the
/// subvolume's contents once the `PARENT_LAYER` phase has completed.
pub struct SeedProvide {
    /// The pre-existing provide.
    pub provide: Provide,
}

/// Build and validate the path -> claims map.
///
/// # Errors
/// - [`CompilerError::SamePathInItem`] if one item provides the same path twice.
/// - [`CompilerError::DuplicateProvide`] if two different claims (items, or
///   an item and the seed) both provide the same path.
/// - [`CompilerError::UnmetRequirement`] if a requirement has no compatible provide.
/// - [`CompilerError::RequiresProtected`] if a requirement's path is exactly
///   a `ProvidesDoNotAccess` claim.
pub fn validate(
    items: &[AdditiveClaims],
    seed: &[SeedProvide],
) -> Result<ValidatedMap, CompilerError> {
    let mut map: ValidatedMap = HashMap::new();

    for seed_provide in seed {
        let path = seed_provide.provide.path().as_str().to_string();
        let entry = map.entry(path).or_default();
        entry.provide = Some(ProvideClaim {
            provide: seed_provide.provide.clone(),
            owner: None,
            from_target: "<parent-layer>".to_string(),
        });
    }

    for (idx, item) in items.iter().enumerate() {
        let mut seen_in_item = std::collections::HashSet::new();
        for provide in &item.provides {
            let path = provide.path().as_str().to_string();
            if !seen_in_item.insert(path.clone()) {
                return Err(CompilerError::SamePathInItem {
                    from_target: item.from_target.clone(),
                    path: provide.path().clone(),
                });
            }
            let entry = map.entry(path).or_default();
            if let Some(existing) = &entry.provide {
                return Err(CompilerError::DuplicateProvide {
                    path: provide.path().clone(),
                    first_target: existing.from_target.clone(),
                    second_target: item.from_target.clone(),
                });
            }
            entry.provide = Some(ProvideClaim {
                provide: provide.clone(),
                owner: Some(idx),
                from_target: item.from_target.clone(),
            });
        }
    }

    for (idx, item) in items.iter().enumerate() {
        for req in &item.requires {
            let path = req.path().as_str().to_string();
            map.entry(path)
                .or_default()
                .requirers
                .push((idx, req.clone(), item.from_target.clone()));
        }
    }

    for claims in map.values() {
        for (_, req, from_target) in &claims.requirers {
            match &claims.provide {
                Some(claim) if matches!(claim.provide, Provide::DoNotAccess(_)) => {
                    return Err(CompilerError::RequiresProtected {
                        from_target: from_target.clone(),
                        path: req.path().clone(),
                    });
                }
                Some(claim) if req.is_satisfied_by(&claim.provide) => {}
                _ => {
                    return Err(CompilerError::UnmetRequirement {
                        from_target: from_target.clone(),
                        path: req.path().clone(),
                    });
                }
            }
        }
    }

    Ok(map)
}

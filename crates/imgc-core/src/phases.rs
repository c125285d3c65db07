//! The phase scheduler (component D).
//!
//! Partitions an item set into phase items and additive items, and emits an
//! ordered sequence of **phase builders** — closures that apply all items
//! of one phase at once, in the fixed ordinal order of [`Phase`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use imgc_schema::Phase;

use crate::error::CompilerError;
use crate::item::{Item, RemoveAction};
use crate::rpm::RpmDriver;
use crate::subvol::SubvolumeDriver;

/// Layer options consumed by phase factories (§6). Exactly one of
/// `yum_from_snapshot`/`build_appliance` must be set.
#[derive(Debug, Clone)]
pub struct LayerOpts {
    /// The name of the layer being built, for diagnostics.
    pub layer_target: String,
    /// Build against a `yum` snapshot repo at this path.
    pub yum_from_snapshot: Option<PathBuf>,
    /// Build inside this build-appliance image.
    pub build_appliance: Option<PathBuf>,
}

impl LayerOpts {
    fn validate(&self) -> Result<(), CompilerError> {
        match (&self.yum_from_snapshot, &self.build_appliance) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(CompilerError::BadLayerOpts),
        }
    }
}

/// Everything a phase builder needs: the subvolume driver, the RPM driver,
/// and the install root/protected paths RPM invocations are scoped to.
pub struct PhaseContext<'a> {
    /// The subvolume under construction.
    pub subvol: &'a mut dyn SubvolumeDriver,
    /// The package-manager driver.
    pub rpm: &'a mut dyn RpmDriver,
    /// The current protected-path set, as computed before this phase ran.
    pub protected: Vec<imgc_schema::NormalizedPath>,
}

/// A closure applying all items of one phase.
pub type PhaseBuilder = Box<dyn FnOnce(&mut PhaseContext<'_>) -> Result<(), CompilerError>>;

/// Partition `items` by phase and emit phase builders in fixed ordinal
/// order. Additive items (`phase_order() == None`) are not represented
/// here — they flow to the validator/graph (E/F) instead.
///
/// # Errors
/// Returns [`CompilerError::AmbiguousParent`], [`CompilerError::BadLayerOpts`],
/// or [`CompilerError::RpmActionConflict`].
pub fn schedule_phases(items: &[Item], opts: &LayerOpts) -> Result<Vec<PhaseBuilder>, CompilerError> {
    opts.validate()?;

    let mut by_phase: BTreeMap<Phase, Vec<&Item>> = BTreeMap::new();
    for item in items {
        if let Some(phase) = item.phase_order() {
            by_phase.entry(phase).or_default().push(item);
        }
    }

    let parent_items = by_phase.remove(&Phase::ParentLayer).unwrap_or_default();
    if parent_items.len() != 1 {
        return Err(CompilerError::AmbiguousParent {
            found: parent_items.len(),
        });
    }

    let mut builders = vec![build_parent_layer(parent_items[0])?];

    let rpm_remove = by_phase.remove(&Phase::RpmRemove).unwrap_or_default();
    let rpm_install = by_phase.remove(&Phase::RpmInstall).unwrap_or_default();
    check_rpm_conflicts(&rpm_remove, &rpm_install)?;

    if !rpm_remove.is_empty() {
        builders.push(build_rpm_bucket(&rpm_remove, Phase::RpmRemove)?);
    }
    if !rpm_install.is_empty() {
        builders.push(build_rpm_bucket(&rpm_install, Phase::RpmInstall)?);
    }

    let remove_paths = by_phase.remove(&Phase::RemovePaths).unwrap_or_default();
    if !remove_paths.is_empty() {
        builders.push(build_remove_paths(&remove_paths)?);
    }

    Ok(builders)
}

fn build_parent_layer(item: &Item) -> Result<PhaseBuilder, CompilerError> {
    match item {
        Item::FilesystemRoot { .. } => Ok(Box::new(|ctx: &mut PhaseContext<'_>| {
            ctx.subvol.create().map_err(CompilerError::from)
        })),
        Item::ParentLayer { source, .. } => {
            let source = source.clone();
            Ok(Box::new(move |ctx: &mut PhaseContext<'_>| {
                ctx.subvol.snapshot(&source).map_err(CompilerError::from)
            }))
        }
        _ => unreachable!("schedule_phases only passes PARENT_LAYER items here"),
    }
}

fn check_rpm_conflicts(remove: &[&Item], install: &[&Item]) -> Result<(), CompilerError> {
    let remove_names: BTreeMap<&str, &str> = remove
        .iter()
        .filter_map(|item| match item {
            Item::RpmAction(a) => Some((a.name.as_str(), a.from_target.as_str())),
            _ => None,
        })
        .collect();
    for item in install {
        if let Item::RpmAction(a) = item {
            if let Some(&remove_target) = remove_names.get(a.name.as_str()) {
                return Err(CompilerError::RpmActionConflict {
                    package: a.name.clone(),
                    first_target: remove_target.to_string(),
                    second_target: a.from_target.clone(),
                });
            }
        }
    }
    Ok(())
}

fn build_rpm_bucket(items: &[&Item], phase: Phase) -> Result<PhaseBuilder, CompilerError> {
    let mut names: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Item::RpmAction(a) => Some(a.name.clone()),
            _ => None,
        })
        .collect();
    names.sort();
    names.dedup();

    Ok(Box::new(move |ctx: &mut PhaseContext<'_>| {
        let install_root = ctx.subvol.path("", false);
        let (install, remove): (Vec<String>, Vec<String>) = match phase {
            Phase::RpmInstall => (names.clone(), Vec::new()),
            Phase::RpmRemove => (Vec::new(), names.clone()),
            _ => unreachable!("build_rpm_bucket only ever schedules RPM phases"),
        };
        ctx.rpm
            .apply(&install, &remove, &install_root, &ctx.protected)
            .map_err(CompilerError::from)
    }))
}

fn build_remove_paths(items: &[&Item]) -> Result<PhaseBuilder, CompilerError> {
    let mut entries: Vec<(String, RemoveAction)> = items
        .iter()
        .filter_map(|item| match item {
            Item::RemovePath(r) => Some((r.path.as_str().to_string(), r.action)),
            _ => None,
        })
        .collect();
    // Reverse-lexicographic by path (deepest first), then if_exists before
    // assert_exists so the two actions can coexist on overlapping trees.
    entries.sort_by(|(path_a, action_a), (path_b, action_b)| {
        path_b
            .cmp(path_a)
            .then_with(|| action_priority(*action_a).cmp(&action_priority(*action_b)))
    });

    Ok(Box::new(move |ctx: &mut PhaseContext<'_>| {
        for (path, action) in &entries {
            let flag = match action {
                RemoveAction::IfExists => "-f",
                RemoveAction::AssertExists => "-",
            };
            ctx.subvol
                .run_as_root(&["rm", "-r", flag, path])
                .map_err(CompilerError::from)?;
        }
        Ok(())
    }))
}

fn action_priority(action: RemoveAction) -> u8 {
    match action {
        RemoveAction::IfExists => 0,
        RemoveAction::AssertExists => 1,
    }
}

//! `imgc`: a thin CLI wrapper around the compiler core.
//!
//! Loads a manifest, runs the phase scheduler against an in-memory
//! [`imgc_core::FakeSubvolume`]/[`imgc_core::FakeRpmDriver`] pair, resolves
//! the additive build order, and prints the resulting plan. A real
//! deployment swaps the fakes for `SubvolumeDriver`/`RpmDriver`
//! implementations backed by `btrfs` and `yum`/`dnf`; this binary exists to
//! exercise and demonstrate the core end to end, not to build real images.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Parser;

use imgc_core::manifest::ManifestError;
use imgc_core::{
    additive_build_order, check_write_allowed, schedule_phases, CompilerError, FakeRpmDriver,
    FakeSubvolume, Item, PhaseContext,
};

/// Command-line arguments for the `imgc` binary.
#[derive(Debug, Parser)]
#[command(name = "imgc", version, about = "Compile a declarative image manifest into a build plan")]
pub struct Cli {
    /// Path to the TOML manifest describing the layer's item set.
    pub manifest: PathBuf,

    /// A host path prefix permitted for a `Mount` item's host-type build
    /// source. May be passed more than once.
    #[arg(long = "allow-host-mount-prefix")]
    pub allow_host_mount_prefix: Vec<String>,

    /// Only report success or failure via the exit code; suppress the plan
    /// report on stdout.
    #[arg(long, short)]
    pub quiet: bool,
}

/// The resolved build plan, as reported to the user after a successful compile.
#[derive(Debug)]
pub struct PlanReport {
    /// The `[layer].layer_target` name.
    pub layer_target: String,
    /// The distinct phases the item set scheduled, in the fixed ordinal
    /// order they ran in.
    pub phases_applied: Vec<String>,
    /// The additive items' `from_target`s, in resolved dependency order.
    pub additive_order: Vec<String>,
}

/// Every way [`compile_plan`] can fail, mapped to an exit code per the
/// compiler's error-handling design (§6): `2` for a manifest or plan defect
/// the caller must fix, `1` for an external driver failure.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The manifest could not be loaded, parsed, or compiled into items.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Scheduling, validating, or ordering the item set failed.
    #[error(transparent)]
    Compiler(#[from] CompilerError),
}

impl CliError {
    /// The process exit code this error should produce, per §6: driver
    /// failures (an external collaborator misbehaving) exit `1`; every other
    /// failure is a defect in the manifest or item set itself and exits `2`.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Manifest(ManifestError::Item(CompilerError::Driver(_)))
            | Self::Compiler(CompilerError::Driver(_)) => 1,
            Self::Manifest(_) | Self::Compiler(_) => 2,
        }
    }

    /// Log this error at `error` level, unwrapping to the inner
    /// [`CompilerError`]'s structured fields when there is one.
    pub fn log(&self) {
        match self {
            Self::Manifest(ManifestError::Item(inner)) => inner.log(),
            Self::Compiler(inner) => inner.log(),
            Self::Manifest(_) => tracing::error!("{self}"),
        }
    }
}

/// Load `cli.manifest`, compile it, and resolve the full build plan.
///
/// # Errors
/// Returns [`CliError::Manifest`] if the manifest cannot be loaded, parsed,
/// or compiled into items, or [`CliError::Compiler`] if phase scheduling or
/// additive-item dependency resolution fails.
pub fn compile_plan(cli: &Cli) -> Result<PlanReport, CliError> {
    let manifest = imgc_core::manifest::load(&cli.manifest)?;
    let allowed_prefixes: Vec<&str> = cli
        .allow_host_mount_prefix
        .iter()
        .map(String::as_str)
        .collect();
    let (items, opts) = imgc_core::manifest::compile(manifest, &allowed_prefixes)?;

    let phases_applied = phase_labels(&items);

    let builders = schedule_phases(&items, &opts)?;
    let mut subvol = FakeSubvolume::new();
    let mut rpm = FakeRpmDriver::new();
    for builder in builders {
        let protected =
            imgc_core::protected::compute_protected(&subvol).map_err(CompilerError::from)?;
        let mut ctx = PhaseContext {
            subvol: &mut subvol,
            rpm: &mut rpm,
            protected,
        };
        builder(&mut ctx)?;
    }

    let order = additive_build_order(&items, &subvol)?;
    for &idx in &order {
        check_write_allowed(&items[idx], &subvol)?;
    }
    let additive_order = order
        .iter()
        .map(|&idx| items[idx].from_target().to_string())
        .collect();

    Ok(PlanReport {
        layer_target: opts.layer_target,
        phases_applied,
        additive_order,
    })
}

/// The distinct phases present in `items`, in fixed ordinal order, labeled
/// for display (`schedule_phases` itself reports only opaque builders).
fn phase_labels(items: &[Item]) -> Vec<String> {
    let phases: BTreeSet<_> = items.iter().filter_map(Item::phase_order).collect();
    phases
        .into_iter()
        .map(|phase| format!("{phase:?}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn compiles_a_minimal_manifest_into_a_plan() {
        let manifest = write_manifest(
            r#"
            [layer]
            layer_target = "demo"
            yum_from_snapshot = "/snapshot"

            [[item]]
            type = "filesystem_root"

            [[item]]
            type = "make_dirs"
            into_dir = "/"
            path_to_make = "a/b"

            [[item]]
            type = "copy_file"
            source = "/host/x"
            dest = "a/b/F"
            "#,
        );
        let cli = Cli {
            manifest: manifest.path().to_path_buf(),
            allow_host_mount_prefix: vec![],
            quiet: false,
        };
        let report = compile_plan(&cli).unwrap();
        assert_eq!(report.layer_target, "demo");
        assert_eq!(report.phases_applied, vec!["ParentLayer"]);
        assert_eq!(report.additive_order.len(), 2);
        let pos = |name: &str| report.additive_order.iter().position(|n| n == name).unwrap();
        assert!(pos("item[1]") < pos("item[2]"));
    }

    #[test]
    fn missing_manifest_file_exits_with_code_two() {
        let cli = Cli {
            manifest: PathBuf::from("/does/not/exist.toml"),
            allow_host_mount_prefix: vec![],
            quiet: false,
        };
        let err = compile_plan(&cli).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn ambiguous_parent_surfaces_as_compiler_error_with_code_two() {
        let manifest = write_manifest(
            r#"
            [layer]
            layer_target = "demo"
            yum_from_snapshot = "/snapshot"
            "#,
        );
        let cli = Cli {
            manifest: manifest.path().to_path_buf(),
            allow_host_mount_prefix: vec![],
            quiet: false,
        };
        let err = compile_plan(&cli).unwrap_err();
        assert!(matches!(
            err,
            CliError::Compiler(CompilerError::AmbiguousParent { found: 0 })
        ));
        assert_eq!(err.exit_code(), 2);
    }
}

//! End-to-end integration tests: a full manifest, parsed, scheduled, and
//! resolved into a build plan against the in-memory fakes, the way
//! `imgc-cli`'s library entry point drives the core in production.

use imgc_core::manifest::{self, ManifestError};
use imgc_core::{
    additive_build_order, check_write_allowed, schedule_phases, CompilerError, FakeRpmDriver,
    FakeSubvolume, PhaseContext,
};

const SCENARIO_MANIFEST: &str = r#"
[layer]
layer_target = "//demo:layer"
yum_from_snapshot = "/snapshot"

[[item]]
type = "filesystem_root"

[[item]]
type = "rpm_action"
from_target = "//demo:install-mice"
package = "mice"
action = "install"

[[item]]
type = "rpm_action"
from_target = "//demo:remove-carrot"
package = "carrot"
action = "remove_if_exists"

[[item]]
type = "remove_path"
from_target = "//demo:cleanup"
path = "tmp/scratch"
action = "if_exists"

[[item]]
type = "make_dirs"
from_target = "//demo:mkdir-a"
into_dir = "/"
path_to_make = "a/b"

[[item]]
type = "copy_file"
from_target = "//demo:copy-f"
source = "/host/f"
dest = "a/b/F"

[[item]]
type = "symlink_to_dir"
from_target = "//demo:link-b"
source = "a/b"
dest = "a/link-to-b"
"#;

fn parse(text: &str) -> manifest::Manifest {
    toml::from_str(text).expect("fixture manifest is valid TOML")
}

#[test]
fn full_manifest_schedules_phases_and_resolves_additive_order() {
    let manifest = parse(SCENARIO_MANIFEST);
    let (items, opts) = manifest::compile(manifest, &[]).unwrap();

    let builders = schedule_phases(&items, &opts).unwrap();
    // parent layer, rpm remove, rpm install, remove paths
    assert_eq!(builders.len(), 4);

    let mut subvol = FakeSubvolume::new();
    let mut rpm = FakeRpmDriver::new();
    for builder in builders {
        let mut ctx = PhaseContext {
            subvol: &mut subvol,
            rpm: &mut rpm,
            protected: imgc_core::protected::compute_protected(&subvol).unwrap(),
        };
        builder(&mut ctx).unwrap();
    }
    assert_eq!(rpm.calls().len(), 2);

    let order = additive_build_order(&items, &subvol).unwrap();
    let names: Vec<&str> = order.iter().map(|&i| items[i].from_target()).collect();
    for &idx in &order {
        check_write_allowed(&items[idx], &subvol).unwrap();
    }

    let pos = |name: &str| names.iter().position(|&n| n == name).unwrap();
    assert!(pos("//demo:mkdir-a") < pos("//demo:copy-f"));
    assert!(pos("//demo:mkdir-a") < pos("//demo:link-b"));
}

#[test]
fn manifest_missing_a_required_mount_source_fails_construction() {
    let manifest = parse(
        r#"
        [layer]
        layer_target = "//demo:layer"
        build_appliance = "/ba"

        [[item]]
        type = "mount"
        mountpoint = "mnt/repo"
        is_directory = true
        "#,
    );
    let err = manifest::compile(manifest, &[]).unwrap_err();
    assert!(matches!(
        err,
        ManifestError::Item(CompilerError::BadEnum { ref field, .. }) if field == "build_source"
    ));
}

#[test]
fn an_item_requiring_a_mounted_path_is_rejected_once_the_mount_is_seeded() {
    let manifest = parse(
        r#"
        [layer]
        layer_target = "//demo:layer"
        build_appliance = "/ba"

        [[item]]
        type = "filesystem_root"

        [[item]]
        type = "make_dirs"
        from_target = "//demo:mkdir-mnt"
        into_dir = "/"
        path_to_make = "mnt"

        [[item]]
        type = "mount"
        from_target = "//demo:repo-mount"
        mountpoint = "mnt/repo"
        is_directory = true
        build_source = { type = "host", source = "/host/repo" }
        "#,
    );
    let (items, opts) =
        manifest::compile(manifest, &["//demo:"]).expect("host mount is allowed under //demo:");

    let builders = schedule_phases(&items, &opts).unwrap();
    let mut subvol = FakeSubvolume::new();
    let mut rpm = FakeRpmDriver::new();
    for builder in builders {
        let mut ctx = PhaseContext {
            subvol: &mut subvol,
            rpm: &mut rpm,
            protected: imgc_core::protected::compute_protected(&subvol).unwrap(),
        };
        builder(&mut ctx).unwrap();
    }

    // The Mount item itself resolves fine (it only reserves the mountpoint),
    // but seeding the mount metadata mid-build simulates what a real
    // subvolume driver would have recorded once the reservation took effect.
    subvol.seed_mountpoint("mnt/repo");

    let order = additive_build_order(&items, &subvol).unwrap();
    for &idx in &order {
        let res = check_write_allowed(&items[idx], &subvol);
        if items[idx].from_target() == "//demo:repo-mount" {
            assert!(matches!(res, Err(CompilerError::WriteIntoProtected { .. })));
        }
    }
}

#![cfg(unix)]

use assert_cmd::prelude::*;
use command_extra::CommandExtra;
use pnbundle_testing_utils::{
    archive::{archive_paths, read_archive},
    bin::pnbundle_command,
    fixture::{WorkspaceFixture, SAMPLE_LOCKFILE},
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use text_block_macros::text_block_fnl;

#[test]
fn bundle_sample_workspace() {
    let fixture = WorkspaceFixture::sample();
    let workspace_files = fixture.list_files();

    pnbundle_command(fixture.root())
        .with_args(["workspace", ".", "--output", "app.tar"])
        .assert()
        .success();

    assert_eq!(fixture.list_files(), workspace_files);

    let items: BTreeMap<_, _> = read_archive(&fixture.root().join("app.tar")).into_iter().collect();
    assert_eq!(
        items["package/node_modules/left-pad"].link_target(),
        ".pnpm/left-pad@1.0.0/node_modules/left-pad",
    );
    assert_eq!(
        items["package/node_modules/util"].link_target(),
        ".pnpm/file+libs+util/node_modules/util",
    );
    assert!(items.contains_key("package/package.json"));
    assert!(
        items.contains_key("package/node_modules/.pnpm/lodash@4.0.0/node_modules/lodash/lodash.js")
    );
    assert!(items.keys().all(|path| !path.contains("jest")));
}

#[test]
fn default_arguments() {
    let fixture = WorkspaceFixture::sample();

    pnbundle_command(fixture.workspace()).assert().success();

    let paths = archive_paths(&fixture.path("out.tar"));
    assert_eq!(paths.first().map(String::as_str), Some(
        "package/node_modules/.pnpm/left-pad@1.0.0/node_modules/left-pad/bin/left-pad",
    ));
    assert!(paths.iter().all(|path| path.starts_with("package/")));
}

#[test]
fn bundle_with_dev_dependencies() {
    let fixture = WorkspaceFixture::sample();

    pnbundle_command(fixture.root()).with_args(["workspace", "--dev"]).assert().success();

    let paths = archive_paths(&fixture.root().join("out.tar"));
    assert!(paths.iter().any(|path| path == "package/node_modules/jest"), "{paths:#?}");
}

#[test]
fn bundle_nested_package() {
    let fixture = WorkspaceFixture::sample();

    pnbundle_command(fixture.root())
        .with_args(["workspace", "libs/util", "-o", "util.tar"])
        .assert()
        .success();

    let items: BTreeMap<_, _> =
        read_archive(&fixture.root().join("util.tar")).into_iter().collect();
    assert_eq!(
        items["package/node_modules/lodash"].link_target(),
        ".pnpm/lodash@4.0.0/node_modules/lodash",
    );
    assert_eq!(items["package/index.js"].text(), "module.exports = require('lodash');\n");
    assert!(items.keys().all(|path| !path.contains("left-pad")), "{:#?}", items.keys());
}

#[test]
fn missing_snapshot_fails() {
    let fixture = WorkspaceFixture::sample();
    let lodash_snapshot = text_block_fnl! {
        "  /lodash/4.0.0:"
        "    resolution: {integrity: sha512-lodash}"
        "    dev: false"
    };
    assert!(SAMPLE_LOCKFILE.contains(lodash_snapshot));
    fixture.lockfile(&SAMPLE_LOCKFILE.replace(lodash_snapshot, ""));

    let output = pnbundle_command(fixture.root()).with_arg("workspace").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    eprintln!("STDERR:\n{stderr}");
    assert!(stderr.contains("graph inconsistency"));
    assert!(stderr.contains("lodash"));
    assert!(!fixture.root().join("out.tar").exists());
}

#[test]
fn missing_lockfile_fails() {
    let fixture = WorkspaceFixture::new();
    fixture.file("package.json", r#"{ "name": "app" }"#);

    pnbundle_command(fixture.workspace()).assert().failure();
    assert!(!fixture.path("out.tar").exists());
}

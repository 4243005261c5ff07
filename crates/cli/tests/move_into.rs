// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn baamhackl() -> Command {
    Command::cargo_bin("baamhackl").unwrap()
}

#[test]
fn moves_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    let target = dir.path().join("out");
    fs::write(&source, b"data").unwrap();
    fs::create_dir(&target).unwrap();

    baamhackl()
        .args(["move-into", target.to_str().unwrap(), source.to_str().unwrap()])
        .assert()
        .success();

    assert!(!source.exists());
    assert_eq!(fs::read(target.join("a.txt")).unwrap(), b"data");
}

#[test]
fn resolves_name_conflicts_without_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    let target = dir.path().join("out");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("a.txt"), b"existing").unwrap();
    fs::write(&source, b"new").unwrap();

    baamhackl()
        .args(["move-into", target.to_str().unwrap(), source.to_str().unwrap()])
        .assert()
        .success();

    assert_eq!(fs::read(target.join("a.txt")).unwrap(), b"existing");

    let decorated: Vec<String> = fs::read_dir(&target)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n != "a.txt")
        .collect();
    assert_eq!(decorated.len(), 1);
    assert!(
        decorated[0].starts_with("a (") && decorated[0].ends_with(").txt"),
        "unexpected name: {:?}",
        decorated
    );
    assert_eq!(fs::read(target.join(&decorated[0])).unwrap(), b"new");
}

#[test]
fn moves_multiple_files() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out");
    fs::create_dir(&target).unwrap();

    let mut args = vec!["move-into".to_string(), target.display().to_string()];
    for name in ["a.txt", "b.txt", "c.txt"] {
        let source = dir.path().join(name);
        fs::write(&source, name.as_bytes()).unwrap();
        args.push(source.display().to_string());
    }

    baamhackl().args(&args).assert().success();

    for name in ["a.txt", "b.txt", "c.txt"] {
        assert!(target.join(name).exists());
    }
}

#[test]
fn rename_sets_destination_name() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    let target = dir.path().join("out");
    fs::write(&source, b"data").unwrap();
    fs::create_dir(&target).unwrap();

    baamhackl()
        .args([
            "move-into",
            "--rename",
            "renamed.txt",
            target.to_str().unwrap(),
            source.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert_eq!(fs::read(target.join("renamed.txt")).unwrap(), b"data");
}

#[test]
fn rename_with_multiple_sources_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out");
    fs::create_dir(&target).unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, b"x").unwrap();
    fs::write(&b, b"x").unwrap();

    baamhackl()
        .args([
            "move-into",
            "--rename",
            "c.txt",
            target.to_str().unwrap(),
            a.to_str().unwrap(),
            b.to_str().unwrap(),
        ])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("single source file"));

    assert!(a.exists());
    assert!(b.exists());
}

#[test]
fn missing_arguments_are_a_usage_error() {
    baamhackl().arg("move-into").assert().code(64);
}

#[test]
fn missing_source_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out");
    fs::create_dir(&target).unwrap();

    baamhackl()
        .args([
            "move-into",
            target.to_str().unwrap(),
            dir.path().join("missing.txt").to_str().unwrap(),
        ])
        .assert()
        .code(69);
}

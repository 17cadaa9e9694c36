use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{tempdir, TempDir};

fn create_test_files(dir: &TempDir, files: &[(&str, &str)]) -> Result<()> {
    for (name, content) in files {
        fs::write(dir.path().join(name), content)?;
    }
    Ok(())
}

#[test]
fn test_search_prints_matching_lines() -> Result<()> {
    let temp_dir = tempdir()?;
    create_test_files(
        &temp_dir,
        &[
            ("file1.txt", "Hello world\nTODO: Fix this\nGoodbye\n"),
            ("file2.txt", "Another TODO here\nSome text\n"),
        ],
    )?;

    let mut cmd = Command::cargo_bin("greplace")?;
    cmd.args(["search", "TODO", "-d", temp_dir.path().to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("TODO: Fix this"))
        .stdout(predicate::str::contains("Another TODO here"))
        .stdout(predicate::str::contains("Found 2 matches in 2 of 2 files"));
    Ok(())
}

#[test]
fn test_search_no_matches() -> Result<()> {
    let temp_dir = tempdir()?;
    create_test_files(&temp_dir, &[("file1.txt", "nothing here\n")])?;

    let mut cmd = Command::cargo_bin("greplace")?;
    cmd.args(["search", "TODO", "-d", temp_dir.path().to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Found 0 matches in 0 of 1 files"));
    Ok(())
}

#[test]
fn test_search_literal_pattern() -> Result<()> {
    let temp_dir = tempdir()?;
    create_test_files(&temp_dir, &[("file1.txt", "a.b\naxb\n")])?;

    let mut cmd = Command::cargo_bin("greplace")?;
    cmd.args([
        "search",
        "a.b",
        "-F",
        "-d",
        temp_dir.path().to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Found 1 matches in 1 of 1 files"));
    Ok(())
}

#[test]
fn test_search_include_filter() -> Result<()> {
    let temp_dir = tempdir()?;
    create_test_files(
        &temp_dir,
        &[("a.rs", "needle\n"), ("b.txt", "needle\n")],
    )?;

    let mut cmd = Command::cargo_bin("greplace")?;
    cmd.args([
        "search",
        "needle",
        "-d",
        temp_dir.path().to_str().unwrap(),
        "-f",
        "*.rs",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a.rs"))
        .stdout(predicate::str::contains("b.txt").not())
        .stdout(predicate::str::contains("Found 1 matches in 1 of 1 files"));
    Ok(())
}

#[test]
fn test_replace_rewrites_and_backs_up() -> Result<()> {
    let temp_dir = tempdir()?;
    create_test_files(&temp_dir, &[("code.txt", "old value\n")])?;

    let mut cmd = Command::cargo_bin("greplace")?;
    cmd.args([
        "replace",
        "old",
        "-r",
        "new",
        "-d",
        temp_dir.path().to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Replaced 1 matches in 1 of 1 files"));

    assert_eq!(
        fs::read_to_string(temp_dir.path().join("code.txt"))?,
        "new value\n"
    );
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("code.txt.bak"))?,
        "old value\n"
    );
    Ok(())
}

#[test]
fn test_replace_without_backup() -> Result<()> {
    let temp_dir = tempdir()?;
    create_test_files(&temp_dir, &[("code.txt", "old value\n")])?;

    let mut cmd = Command::cargo_bin("greplace")?;
    cmd.args([
        "replace",
        "old",
        "-r",
        "new",
        "--no-backup",
        "-d",
        temp_dir.path().to_str().unwrap(),
    ]);

    cmd.assert().success();
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("code.txt"))?,
        "new value\n"
    );
    assert!(!temp_dir.path().join("code.txt.bak").exists());
    Ok(())
}

#[test]
fn test_invalid_regex_fails() -> Result<()> {
    let temp_dir = tempdir()?;

    let mut cmd = Command::cargo_bin("greplace")?;
    cmd.args(["search", "(unclosed", "-d", temp_dir.path().to_str().unwrap()]);

    cmd.assert().failure();
    Ok(())
}

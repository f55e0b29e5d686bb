use std::error::Error;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli(workspace: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("papercraft-cli")?;
    cmd.current_dir(workspace)
        .args(["--workspace", workspace.to_str().unwrap()]);
    Ok(cmd)
}

#[test]
fn print_runs_to_completion_and_records_history() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?
        .args(["print", "dot-grid", "--paper", "A5", "--seed", "7", "--user", "alice"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Printing Dot Grid")
                .and(predicate::str::contains("Progress: 100%"))
                .and(predicate::str::contains("Print completed: Dot Grid"))
                .and(predicate::str::contains("Recorded in history for user alice")),
        );

    assert!(workspace.path().join(".papercraft/history.json").exists());

    cli(workspace.path())?
        .args(["history", "stats", "--user", "alice"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Total prints: 1")
                .and(predicate::str::contains("Most used paper size: A5")),
        );

    cli(workspace.path())?
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No print history for local"));
    Ok(())
}

#[test]
fn history_clear_empties_the_user_history() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    for style in ["math-grid", "music-staff"] {
        cli(workspace.path())?
            .args(["print", style, "--seed", "1"])
            .assert()
            .success();
    }
    cli(workspace.path())?
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Music Staff").and(predicate::str::contains("Math Grid")));
    cli(workspace.path())?
        .args(["history", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 2 history entries"));
    Ok(())
}

#[test]
fn unknown_style_fails() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?
        .args(["print", "no-such-style"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown style 'no-such-style'"));
    Ok(())
}

#[test]
fn preview_writes_a_png() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let output = workspace.path().join("grid.png");
    cli(workspace.path())?
        .args([
            "preview",
            "tian-zi-ge",
            "--color-mode",
            "grayscale",
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("grayscale(100%)"));

    let image = image::open(&output)?;
    assert_eq!(image.width(), 300);
    Ok(())
}

#[test]
fn raster_preview_without_images_uses_placeholder() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?
        .args(["preview", "kraft-letter"])
        .assert()
        .success()
        .stdout(predicate::str::contains("placeholder"));
    assert!(workspace.path().join("kraft-letter.png").exists());
    Ok(())
}

#[test]
fn favorites_round_trip() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?
        .args(["favorites", "add", "kraft-letter"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 'kraft-letter'"));
    cli(workspace.path())?
        .args(["favorites", "add", "kraft-letter"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already a favorite"));
    cli(workspace.path())?
        .args(["favorites", "toggle", "dot-grid"])
        .assert()
        .success();
    cli(workspace.path())?
        .args(["favorites", "list", "--category", "letter"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kraft-letter").and(predicate::str::contains("1 favorites")));
    cli(workspace.path())?
        .args(["favorites", "toggle", "dot-grid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed from favorites"));
    Ok(())
}

#[test]
fn catalog_styles_paginate() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?
        .args(["catalog", "styles", "--category", "practice", "--limit", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Showing 5 of 11 styles (more available)"));
    cli(workspace.path())?
        .args(["catalog", "show", "dot-grid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Related:"));
    Ok(())
}

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn preferences_import_and_export() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let import_path = workspace.path().join("prefs.json");
    fs::write(
        &import_path,
        r#"{
            "version": 1,
            "theme": "dark",
            "language": "en",
            "default_paper_size": "Letter",
            "default_print_quality": "high"
        }"#,
    )?;

    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "preferences",
            "import",
            import_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let export_path = workspace.path().join("prefs-export.json");
    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "preferences",
            "export",
            "--output",
            export_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let exported = fs::read_to_string(export_path)?;
    assert!(exported.contains("\"theme\": \"dark\""));
    assert!(exported.contains("\"tick_interval_ms\": 500"));
    Ok(())
}

#[test]
fn preferences_drive_the_default_paper() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let data_dir = workspace.path().join(".papercraft");
    fs::create_dir_all(&data_dir)?;
    fs::write(
        data_dir.join("preferences.json"),
        r#"{ "default_paper_size": "Legal" }"#,
    )?;

    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "layout",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paper: Legal"));

    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "preferences",
            "show",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"default_paper_size\": \"Legal\""));
    Ok(())
}

#[test]
fn importing_a_missing_file_fails() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "preferences",
            "import",
            workspace.path().join("missing.json").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

fn cli() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("papercraft-cli")?;
    cmd.current_dir(repo_root());
    Ok(cmd)
}

fn repo_root() -> PathBuf {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|dir| dir.parent())
        .expect("workspace root")
        .to_path_buf()
}

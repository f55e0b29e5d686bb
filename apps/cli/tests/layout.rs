use std::error::Error;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn a4_standard_margins_inset_six_units() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    Command::cargo_bin("papercraft-cli")?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "layout",
            "--paper",
            "A4",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Page:    x 0.00 y 0.00 w 300.00 h 424.29")
                .and(predicate::str::contains(
                    "Content: x 6.00 y 6.00 w 288.00 h 412.29",
                ))
                .and(predicate::str::contains("Zoom: 100%")),
        );
    Ok(())
}

#[test]
fn zoom_is_clamped_and_bands_are_reported() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    Command::cargo_bin("papercraft-cli")?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "layout",
            "--zoom",
            "900",
            "--header",
            "Name:",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Zoom: 200%")
                .and(predicate::str::contains("Header:"))
                .and(predicate::str::contains("\"Name:\""))
                .and(predicate::str::contains("Footer:").not()),
        );
    Ok(())
}

#[test]
fn layout_json_is_machine_readable() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let output = Command::cargo_bin("papercraft-cli")?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "layout",
            "--paper",
            "Letter",
            "--landscape",
            "--margins",
            "0,0,0,0",
            "--json",
        ])
        .output()?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let page = &value["page"];
    let content = &value["content"];
    assert_eq!(page["width"], content["width"]);
    assert_eq!(page["height"], content["height"]);
    assert!(value["aspect_ratio"].as_f64().unwrap_or_default() > 1.0);
    Ok(())
}

#[test]
fn malformed_margins_are_rejected() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    Command::cargo_bin("papercraft-cli")?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "layout",
            "--margins",
            "10,20",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--margins expects"));
    Ok(())
}

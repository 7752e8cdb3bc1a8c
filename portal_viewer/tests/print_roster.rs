use std::fs;
use std::process::Command;

use anyhow::{Context, Result};
use tempfile::tempdir;

fn print_roster(extra_args: &[&str]) -> Result<String> {
    let output = Command::new(env!("CARGO_BIN_EXE_portal_viewer"))
        .arg("--print-roster")
        .args(extra_args)
        .output()
        .context("executing portal_viewer")?;
    assert!(
        output.status.success(),
        "portal_viewer exited with {:?}",
        output.status
    );
    String::from_utf8(output.stdout).context("roster output utf-8")
}

#[test]
fn default_roster_listing_runs_headless() -> Result<()> {
    let listing = print_roster(&[])?;
    assert!(listing.contains("3 stages"), "unexpected listing:\n{listing}");
    assert!(listing.contains("frame 2.0 x 3.0 x 0.1, backdrop radius 5.0"));
    for label in ["Fairy", "Lobster", "Paladin"] {
        assert!(listing.contains(label), "missing {label} in:\n{listing}");
    }
    Ok(())
}

#[test]
fn custom_roster_listing_uses_the_preset() -> Result<()> {
    let temp = tempdir().context("creating temp dir")?;
    let roster_path = temp.path().join("roster.json");
    fs::write(
        &roster_path,
        r#"{
    "stages": [
        { "name": "AB", "label": "Abbey", "color": [0.1, 0.2, 0.3], "texture": "abbey.png" },
        { "name": "CD", "label": "Cinder", "color": [0.4, 0.5, 0.6], "texture": "cinder.png" }
    ]
}"#,
    )
    .context("writing roster preset")?;

    let listing = print_roster(&[
        "--stages",
        roster_path.to_str().context("roster path utf-8")?,
    ])?;
    assert!(listing.contains("2 stages"), "unexpected listing:\n{listing}");
    assert!(listing.contains("Abbey"));
    assert!(listing.contains("Cinder"));
    assert!(!listing.contains("Fairy"));
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tempfile::{tempdir, TempDir};

/// Lay out a project shaped like the thermostat repo: an entry program, a
/// boot.py, a driver bundle, and one standalone module.
fn scaffold_project() -> (TempDir, PathBuf) {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();

    fs::create_dir_all(root.join("src")).expect("mkdir src");
    fs::write(root.join("src/thermostat.py"), b"print('thermostat')\n").expect("write");
    fs::write(root.join("src/boot.py"), b"print('boot')\n").expect("write");

    fs::create_dir_all(root.join("lib/adafruit_display_text")).expect("mkdir lib");
    fs::write(root.join("lib/adafruit_display_text/label.py"), b"\n").expect("write");

    fs::create_dir_all(root.join("modules")).expect("mkdir modules");
    fs::write(root.join("modules/priority_queue.py"), b"\n").expect("write");

    let manifest = root.join("cpship.toml");
    fs::write(&manifest, "[source]\nentry = \"thermostat.py\"\n").expect("write manifest");

    (tmp, manifest)
}

fn fake_mount() -> TempDir {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("boot_out.txt"), b"Adafruit CircuitPython 9.0.0").expect("write");
    tmp
}

fn cpship(manifest: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cpship"));
    cmd.arg("install").arg("--manifest").arg(manifest);
    cmd
}

#[test]
fn install_deploys_entry_as_code_py() {
    let (_project, manifest) = scaffold_project();
    let mount = fake_mount();

    let output = cpship(&manifest)
        .arg("--mount")
        .arg(mount.path())
        .output()
        .expect("run cpship");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert_eq!(
        fs::read(mount.path().join("code.py")).expect("read code.py"),
        b"print('thermostat')\n"
    );
    assert_eq!(
        fs::read(mount.path().join("boot.py")).expect("read boot.py"),
        b"print('boot')\n"
    );
    assert!(!mount.path().join("thermostat.py").exists());
}

#[test]
fn install_lib_lands_under_lib() {
    let (_project, manifest) = scaffold_project();
    let mount = fake_mount();

    let output = Command::new(env!("CARGO_BIN_EXE_cpship"))
        .args(["install-lib", "--manifest"])
        .arg(&manifest)
        .arg("--mount")
        .arg(mount.path())
        .output()
        .expect("run cpship");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(mount
        .path()
        .join("lib/adafruit_display_text/label.py")
        .is_file());
    assert!(mount.path().join("lib/priority_queue.py").is_file());
    assert!(!mount.path().join("code.py").exists());
}

#[test]
fn second_install_is_all_up_to_date() {
    let (_project, manifest) = scaffold_project();
    let mount = fake_mount();

    let first = cpship(&manifest)
        .arg("--mount")
        .arg(mount.path())
        .output()
        .expect("run cpship");
    assert!(first.status.success());

    let second = cpship(&manifest)
        .arg("--mount")
        .arg(mount.path())
        .arg("--ndjson")
        .output()
        .expect("run cpship again");
    assert!(second.status.success());

    let stdout = String::from_utf8(second.stdout).expect("utf8");
    let records: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("parse ndjson line"))
        .collect();

    assert!(!records.is_empty());
    assert!(records
        .iter()
        .all(|r| r["outcome"].as_str() == Some("up_to_date")));
}

#[test]
fn dry_run_reports_without_writing() {
    let (_project, manifest) = scaffold_project();
    let mount = fake_mount();

    let output = cpship(&manifest)
        .arg("--mount")
        .arg(mount.path())
        .args(["--dry-run", "--json"])
        .output()
        .expect("run cpship");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let parsed: Value = serde_json::from_slice(&output.stdout).expect("parse json report");
    let records = parsed.as_array().expect("json report is an array");
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r["outcome"].as_str() == Some("would_copy")));
    assert!(!mount.path().join("code.py").exists());
}

#[test]
fn mount_env_override_is_honoured() {
    let (_project, manifest) = scaffold_project();
    let mount = fake_mount();

    let output = cpship(&manifest)
        .env("CPSHIP_MOUNT", mount.path())
        .output()
        .expect("run cpship");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(mount.path().join("code.py").is_file());
}

#[test]
fn missing_mount_is_a_clean_error() {
    let (_project, manifest) = scaffold_project();

    let output = cpship(&manifest)
        .arg("--mount")
        .arg("/nonexistent/CIRCUITPY")
        .output()
        .expect("run cpship");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("mount path does not exist"), "stderr: {stderr}");
}

#[test]
fn install_fonts_without_font_dir_is_a_no_op() {
    let (_project, manifest) = scaffold_project();
    let mount = fake_mount();

    let output = Command::new(env!("CARGO_BIN_EXE_cpship"))
        .args(["install-fonts", "--manifest"])
        .arg(&manifest)
        .arg("--mount")
        .arg(mount.path())
        .arg("--json")
        .output()
        .expect("run cpship");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let parsed: Value = serde_json::from_slice(&output.stdout).expect("parse json report");
    assert_eq!(parsed.as_array().map(Vec::len), Some(0));
    assert!(!mount.path().join("font").exists());
}

#[cfg(unix)]
#[test]
fn lint_exit_status_passes_through() {
    let (project, _) = scaffold_project();
    let failing = project.path().join("failing.toml");
    fs::write(
        &failing,
        "[source]\nentry = \"thermostat.py\"\n\n[lint]\nprogram = \"false\"\n",
    )
    .expect("write manifest");

    let output = Command::new(env!("CARGO_BIN_EXE_cpship"))
        .args(["lint", "--manifest"])
        .arg(&failing)
        .output()
        .expect("run cpship");

    assert_eq!(output.status.code(), Some(1));

    let passing = project.path().join("passing.toml");
    fs::write(
        &passing,
        "[source]\nentry = \"thermostat.py\"\n\n[lint]\nprogram = \"true\"\n",
    )
    .expect("write manifest");

    let output = Command::new(env!("CARGO_BIN_EXE_cpship"))
        .args(["lint", "--manifest"])
        .arg(&passing)
        .output()
        .expect("run cpship");

    assert_eq!(output.status.code(), Some(0));
}

#[cfg(unix)]
#[test]
fn all_stops_when_lint_fails() {
    let (project, _) = scaffold_project();
    let mount = fake_mount();

    let manifest = project.path().join("strict.toml");
    fs::write(
        &manifest,
        "[source]\nentry = \"thermostat.py\"\n\n[lint]\nprogram = \"false\"\n",
    )
    .expect("write manifest");

    let output = Command::new(env!("CARGO_BIN_EXE_cpship"))
        .args(["all", "--manifest"])
        .arg(&manifest)
        .arg("--mount")
        .arg(mount.path())
        .output()
        .expect("run cpship");

    assert!(!output.status.success());
    assert!(!mount.path().join("code.py").exists());
}

#[test]
fn missing_linter_program_is_an_error() {
    let (project, _) = scaffold_project();
    let manifest = project.path().join("absent.toml");
    fs::write(
        &manifest,
        "[source]\nentry = \"thermostat.py\"\n\n[lint]\nprogram = \"cpship-no-such-linter\"\n",
    )
    .expect("write manifest");

    let output = Command::new(env!("CARGO_BIN_EXE_cpship"))
        .args(["lint", "--manifest"])
        .arg(&manifest)
        .output()
        .expect("run cpship");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cpship-no-such-linter"), "stderr: {stderr}");
}

//! CIRCUITPY mount discovery and validation.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing::warn;

/// Environment override for the deploy target. Accepts a `:`/`;` separated
/// list; the first existing path wins.
pub const MOUNT_ENV: &str = "CPSHIP_MOUNT";

const BOOT_MARKER: &str = "boot_out.txt";

/// True when the directory looks like a mounted CircuitPython device.
///
/// The firmware writes `boot_out.txt` to the drive root on every boot.
pub fn is_circuitpy_mount(path: &Path) -> bool {
    path.join(BOOT_MARKER).is_file()
}

/// Resolve the deploy target, preferring an explicit path over discovery.
///
/// An explicit path must exist but is otherwise trusted; a missing boot
/// marker only warns, since freshly formatted boards lack one.
pub fn resolve_mount(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_dir() {
            return Err(anyhow!("mount path does not exist: {}", path.display()));
        }
        if !is_circuitpy_mount(path) {
            warn!(
                "{} does not contain {BOOT_MARKER}; deploying anyway",
                path.display()
            );
        }
        return Ok(path.to_path_buf());
    }

    if let Ok(raw) = env::var(MOUNT_ENV) {
        let listed: Vec<PathBuf> = raw
            .split([':', ';'])
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();

        return listed
            .iter()
            .find(|p| p.is_dir())
            .cloned()
            .ok_or_else(|| anyhow!("{MOUNT_ENV} is set but no listed path exists"));
    }

    let candidates = platform_candidates();
    let found = candidates.iter().find(|p| is_circuitpy_mount(p)).cloned();

    found.ok_or_else(|| {
        let looked: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
        if looked.is_empty() {
            anyhow!("no CIRCUITPY mount candidates on this platform; pass --mount or set {MOUNT_ENV}")
        } else {
            anyhow!(
                "no CIRCUITPY mount found (looked in: {}); pass --mount or set {MOUNT_ENV}",
                looked.join(", ")
            )
        }
    })
}

fn platform_candidates() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    #[cfg(target_os = "macos")]
    {
        candidates.push(PathBuf::from("/Volumes/CIRCUITPY"));
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(user) = env::var_os("USER") {
            candidates.push(Path::new("/media").join(&user).join("CIRCUITPY"));
            candidates.push(Path::new("/run/media").join(&user).join("CIRCUITPY"));
        }
        candidates.push(PathBuf::from("/media/CIRCUITPY"));
    }

    #[cfg(target_os = "windows")]
    {
        for letter in b'A'..=b'Z' {
            candidates.push(PathBuf::from(format!("{}:\\", letter as char)));
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn detects_boot_marker() {
        let tmp = tempdir().expect("tempdir");
        assert!(!is_circuitpy_mount(tmp.path()));

        fs::write(tmp.path().join("boot_out.txt"), b"Adafruit CircuitPython 9.0.0").expect("write");
        assert!(is_circuitpy_mount(tmp.path()));
    }

    #[test]
    fn explicit_mount_must_exist() {
        let result = resolve_mount(Some(Path::new("/nonexistent/CIRCUITPY")));
        assert!(result.is_err());
    }

    #[test]
    fn explicit_mount_wins_without_marker() {
        let tmp = tempdir().expect("tempdir");
        let resolved = resolve_mount(Some(tmp.path())).expect("resolve");
        assert_eq!(resolved, tmp.path());
    }

    #[test]
    fn env_override_selects_first_existing() {
        let tmp = tempdir().expect("tempdir");
        let missing = tmp.path().join("gone");
        let raw = format!("{}:{}", missing.display(), tmp.path().display());

        env::set_var(MOUNT_ENV, &raw);
        let resolved = resolve_mount(None);
        env::remove_var(MOUNT_ENV);

        assert_eq!(resolved.expect("resolve"), tmp.path());
    }
}

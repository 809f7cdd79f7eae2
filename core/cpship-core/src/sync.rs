//! Copy planning and execution against the device filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::discovery::{flat_modules, TreeDiscovery};
use crate::manifest::Manifest;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadRole {
    Source,
    Library,
    Font,
}

/// One planned copy from the project tree to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyAction {
    pub role: PayloadRole,
    pub source: PathBuf,
    pub dest: PathBuf,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyOutcome {
    Copied,
    UpToDate,
    WouldCopy,
}

/// A planned copy together with what happened to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyRecord {
    pub role: PayloadRole,
    pub source: PathBuf,
    pub dest: PathBuf,
    pub outcome: CopyOutcome,
}

#[derive(Debug, Default, Clone)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub force: bool,
    pub jobs: Option<usize>,
}

/// Plan the source-file installs: the entry file becomes `code.py` on the
/// device, everything else keeps its relative path under the mount root.
pub fn plan_source(manifest: &Manifest, project_root: &Path, mount: &Path) -> Result<Vec<CopyAction>> {
    let root = project_root.join(&manifest.source.dir);
    let excludes = manifest.source.compiled_excludes()?;
    let files = TreeDiscovery::new(root)
        .with_excludes(excludes)
        .required(true)
        .discover()?;

    let entry = Path::new(&manifest.source.entry);
    let actions = files
        .into_iter()
        .map(|file| {
            let dest_rel = if file.relative == entry {
                PathBuf::from("code.py")
            } else {
                file.relative
            };
            CopyAction {
                role: PayloadRole::Source,
                source: file.path,
                dest: mount.join(dest_rel),
            }
        })
        .collect();

    Ok(actions)
}

/// Plan the library installs: the bundle tree and the flat modules both land
/// under `<mount>/lib`.
pub fn plan_lib(manifest: &Manifest, project_root: &Path, mount: &Path) -> Result<Vec<CopyAction>> {
    let excludes = manifest.source.compiled_excludes()?;
    let lib_root = mount.join("lib");
    let mut actions = Vec::new();

    let bundle = TreeDiscovery::new(project_root.join(&manifest.lib.bundle_dir))
        .with_excludes(excludes)
        .discover()?;
    for file in bundle {
        actions.push(CopyAction {
            role: PayloadRole::Library,
            dest: lib_root.join(&file.relative),
            source: file.path,
        });
    }

    for module in flat_modules(&project_root.join(&manifest.lib.module_dir))? {
        actions.push(CopyAction {
            role: PayloadRole::Library,
            dest: lib_root.join(&module.relative),
            source: module.path,
        });
    }

    Ok(actions)
}

/// Plan the font installs for already-built PCFs.
pub fn plan_fonts(manifest: &Manifest, built: &[PathBuf], mount: &Path) -> Vec<CopyAction> {
    let device_dir = mount.join(&manifest.fonts.device_dir);

    built
        .iter()
        .filter_map(|pcf| {
            let name = pcf.file_name()?;
            Some(CopyAction {
                role: PayloadRole::Font,
                source: pcf.clone(),
                dest: device_dir.join(name),
            })
        })
        .collect()
}

/// Execute a plan: decide freshness in parallel, then copy stale files in
/// plan order. Nothing on the device is ever deleted.
pub fn execute(plan: &[CopyAction], opts: &SyncOptions) -> Result<Vec<CopyRecord>> {
    let run = || -> Result<Vec<CopyRecord>> {
        let stale: Vec<bool> = plan
            .par_iter()
            .map(|action| opts.force || !is_up_to_date(&action.source, &action.dest))
            .collect();

        let mut records = Vec::with_capacity(plan.len());
        for (action, needs_copy) in plan.iter().zip(stale) {
            let outcome = if !needs_copy {
                debug!("up to date: {}", action.dest.display());
                CopyOutcome::UpToDate
            } else if opts.dry_run {
                CopyOutcome::WouldCopy
            } else {
                copy_file(&action.source, &action.dest)?;
                info!("installed {}", action.dest.display());
                CopyOutcome::Copied
            };

            records.push(CopyRecord {
                role: action.role,
                source: action.source.clone(),
                dest: action.dest.clone(),
                outcome,
            });
        }

        Ok(records)
    };

    if let Some(jobs) = opts.jobs {
        let pool = ThreadPoolBuilder::new().num_threads(jobs).build()?;
        pool.install(run)
    } else {
        run()
    }
}

/// Make-style freshness: same length and the destination is no older.
fn is_up_to_date(source: &Path, dest: &Path) -> bool {
    let (src_meta, dest_meta) = match (fs::metadata(source), fs::metadata(dest)) {
        (Ok(s), Ok(d)) => (s, d),
        _ => return false,
    };

    if src_meta.len() != dest_meta.len() {
        return false;
    }

    match (src_meta.modified(), dest_meta.modified()) {
        (Ok(src_time), Ok(dest_time)) => dest_time >= src_time,
        _ => false,
    }
}

fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }

    fs::copy(source, dest)
        .with_context(|| format!("copying {} -> {}", source.display(), dest.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn up_to_date_requires_existing_dest() {
        let tmp = tempdir().expect("tempdir");
        let source = tmp.path().join("a.py");
        fs::write(&source, b"print()").expect("write");

        assert!(!is_up_to_date(&source, &tmp.path().join("missing.py")));
    }

    #[test]
    fn up_to_date_after_copy() {
        let tmp = tempdir().expect("tempdir");
        let source = tmp.path().join("a.py");
        let dest = tmp.path().join("mount/a.py");
        fs::write(&source, b"print()").expect("write");

        copy_file(&source, &dest).expect("copy");
        assert!(is_up_to_date(&source, &dest));
    }

    #[test]
    fn length_mismatch_is_stale() {
        let tmp = tempdir().expect("tempdir");
        let source = tmp.path().join("a.py");
        let dest = tmp.path().join("b.py");
        fs::write(&source, b"print('new longer body')").expect("write");
        fs::write(&dest, b"print()").expect("write");

        assert!(!is_up_to_date(&source, &dest));
    }

    #[test]
    fn font_plan_keeps_filenames() {
        let manifest = Manifest::default();
        let built = vec![
            PathBuf::from("/p/build/fonts/DejaVuSansMono-12.pcf"),
            PathBuf::from("/p/build/fonts/DejaVuSansMono-Bold-30.pcf"),
        ];

        let plan = plan_fonts(&manifest, &built, Path::new("/mnt/CIRCUITPY"));

        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan[0].dest,
            PathBuf::from("/mnt/CIRCUITPY/font/DejaVuSansMono-12.pcf")
        );
        assert_eq!(
            plan[1].dest,
            PathBuf::from("/mnt/CIRCUITPY/font/DejaVuSansMono-Bold-30.pcf")
        );
        assert!(plan.iter().all(|a| a.role == PayloadRole::Font));
    }
}

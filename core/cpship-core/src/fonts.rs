//! TrueType to PCF conversion via `otf2bdf` and `bdftopcf`.
//!
//! Conversion is best-effort: a missing input, a missing tool, or a failed
//! conversion drops that face/size with a warning and the rest proceed. Copy
//! steps elsewhere stay strict; only this pipeline swallows failures.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::discovery::is_font_source;
use crate::manifest::FontConfig;

/// One face/size conversion from a TTF input to a staged PCF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontJob {
    pub ttf: PathBuf,
    pub bdf: PathBuf,
    pub pcf: PathBuf,
    pub size: u32,
}

/// Lay out the conversion jobs for the configured faces and sizes.
///
/// The PCF name derives from the TTF stem, so `DejaVuSansMono-Bold.ttf` at
/// size 12 stages `DejaVuSansMono-Bold-12.pcf`, the name the firmware loads.
pub fn plan_jobs(config: &FontConfig, project_root: &Path) -> Vec<FontJob> {
    let font_dir = project_root.join(&config.dir);
    let build_dir = project_root.join(&config.build_dir);

    let mut faces = vec![config.regular.clone()];
    if let Some(bold) = &config.bold {
        faces.push(bold.clone());
    }

    let mut jobs = Vec::new();
    for face in faces {
        let ttf = font_dir.join(&face);
        if !is_font_source(&ttf) {
            warn!("not a TrueType input, skipping: {}", ttf.display());
            continue;
        }

        let stem = match ttf.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };

        for &size in &config.sizes {
            jobs.push(FontJob {
                bdf: build_dir.join(format!("{stem}-{size}.bdf")),
                pcf: build_dir.join(format!("{stem}-{size}.pcf")),
                ttf: ttf.clone(),
                size,
            });
        }
    }

    jobs
}

/// Run the conversion jobs and return the PCFs present afterwards.
pub fn build(config: &FontConfig, project_root: &Path, force: bool) -> Result<Vec<PathBuf>> {
    let mut built = Vec::new();

    for job in plan_jobs(config, project_root) {
        if !job.ttf.is_file() {
            warn!("font input missing, skipping: {}", job.ttf.display());
            continue;
        }

        if !force && is_fresh(&job.ttf, &job.pcf) {
            debug!("font cached: {}", job.pcf.display());
            built.push(job.pcf);
            continue;
        }

        if let Some(parent) = job.pcf.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        if convert(&job) {
            built.push(job.pcf.clone());
        }
    }

    Ok(built)
}

/// One TTF -> BDF -> PCF conversion. Returns whether the PCF materialized.
fn convert(job: &FontJob) -> bool {
    // otf2bdf exits nonzero even on successful conversions, so its status is
    // ignored; the BDF on disk is the real signal.
    let otf2bdf = Command::new("otf2bdf")
        .arg("-p")
        .arg(job.size.to_string())
        .arg("-o")
        .arg(&job.bdf)
        .arg(&job.ttf)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    if let Err(err) = otf2bdf {
        warn!("otf2bdf unavailable ({err}); skipping {}", job.ttf.display());
        return false;
    }

    if !job.bdf.is_file() {
        warn!(
            "no BDF produced for {} at size {}",
            job.ttf.display(),
            job.size
        );
        return false;
    }

    let bdftopcf = Command::new("bdftopcf")
        .arg("-o")
        .arg(&job.pcf)
        .arg(&job.bdf)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match bdftopcf {
        Ok(status) if status.success() && job.pcf.is_file() => {
            debug!("built {}", job.pcf.display());
            true
        }
        Ok(status) => {
            warn!("bdftopcf failed for {} ({status})", job.bdf.display());
            false
        }
        Err(err) => {
            warn!("bdftopcf unavailable ({err}); skipping {}", job.bdf.display());
            false
        }
    }
}

fn is_fresh(source: &Path, dest: &Path) -> bool {
    let (src_meta, dest_meta) = match (fs::metadata(source), fs::metadata(dest)) {
        (Ok(s), Ok(d)) => (s, d),
        _ => return false,
    };

    matches!(
        (src_meta.modified(), dest_meta.modified()),
        (Ok(src_time), Ok(dest_time)) if dest_time >= src_time
    )
}

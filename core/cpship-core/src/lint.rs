//! Linter invocation with an assembled module search path.

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::discovery::{flat_modules, TreeDiscovery};
use crate::manifest::Manifest;

/// Directories the linter should resolve imports from. Only existing
/// directories are kept, so a project without local modules lints cleanly.
pub fn search_path(manifest: &Manifest, project_root: &Path) -> Vec<PathBuf> {
    let mut roots = vec![
        project_root.join(&manifest.source.dir),
        project_root.join(&manifest.lib.bundle_dir),
        project_root.join(&manifest.lib.module_dir),
    ];
    roots.extend(manifest.lint.extra_paths.iter().map(|p| project_root.join(p)));
    roots.retain(|p| p.is_dir());
    roots
}

/// Python files handed to the linter: the source tree plus standalone
/// modules, sorted. Compiled `.mpy` modules are not lintable and are skipped.
pub fn lint_targets(manifest: &Manifest, project_root: &Path) -> Result<Vec<PathBuf>> {
    let excludes = manifest.source.compiled_excludes()?;
    let mut targets: Vec<PathBuf> = TreeDiscovery::new(project_root.join(&manifest.source.dir))
        .with_excludes(excludes)
        .required(true)
        .discover()?
        .into_iter()
        .map(|f| f.path)
        .filter(|p| is_plain_python(p))
        .collect();

    for module in flat_modules(&project_root.join(&manifest.lib.module_dir))? {
        if is_plain_python(&module.path) {
            targets.push(module.path);
        }
    }

    targets.sort();
    Ok(targets)
}

fn is_plain_python(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("py")
}

/// Run the configured linter with `PYTHONPATH` set to the assembled search
/// path. The child's exit status is returned un-altered.
pub fn run(manifest: &Manifest, project_root: &Path) -> Result<ExitStatus> {
    let targets = lint_targets(manifest, project_root)?;
    if targets.is_empty() {
        return Err(anyhow!(
            "no Python files to lint under {}",
            project_root.join(&manifest.source.dir).display()
        ));
    }

    let joined = env::join_paths(search_path(manifest, project_root))
        .context("assembling linter search path")?;

    debug!("PYTHONPATH={joined:?}");
    info!(
        "linting {} files with {}",
        targets.len(),
        manifest.lint.program
    );

    Command::new(&manifest.lint.program)
        .env("PYTHONPATH", &joined)
        .args(&manifest.lint.args)
        .args(&targets)
        .status()
        .with_context(|| format!("running linter {}", manifest.lint.program))
}

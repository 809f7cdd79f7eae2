//! Enumeration of deployable project files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use walkdir::WalkDir;

/// A file slated for deployment, addressed relative to its discovery root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadFile {
    pub path: PathBuf,
    pub relative: PathBuf,
}

/// Recursive walker that preserves paths relative to the root.
#[derive(Debug, Clone)]
pub struct TreeDiscovery {
    root: PathBuf,
    excludes: Vec<Regex>,
    required: bool,
}

impl TreeDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excludes: Vec::new(),
            required: false,
        }
    }

    pub fn with_excludes(mut self, excludes: Vec<Regex>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Treat a missing root as an error instead of an empty result.
    pub fn required(mut self, yes: bool) -> Self {
        self.required = yes;
        self
    }

    /// Walk the root, returning files sorted by relative path.
    pub fn discover(&self) -> Result<Vec<PayloadFile>> {
        if !self.root.is_dir() {
            if self.required {
                return Err(anyhow!(
                    "directory does not exist: {}",
                    self.root.display()
                ));
            }
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .with_context(|| format!("stripping root {}", self.root.display()))?
                .to_path_buf();

            if self.is_excluded(&relative) {
                continue;
            }

            found.push(PayloadFile {
                path: entry.path().to_path_buf(),
                relative,
            });
        }

        found.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(found)
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        let rendered = relative.to_string_lossy();
        self.excludes.iter().any(|re| re.is_match(&rendered))
    }
}

/// Single-level listing of standalone Python modules, sorted by name.
///
/// A missing root yields the empty set; projects without local modules are
/// normal.
pub fn flat_modules(root: &Path) -> Result<Vec<PayloadFile>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && is_module(&path) {
            found.push(PayloadFile {
                relative: PathBuf::from(entry.file_name()),
                path,
            });
        }
    }

    found.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(found)
}

pub fn is_module(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return false,
    };

    matches!(ext.as_str(), "py" | "mpy")
}

pub fn is_font_source(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return false,
    };

    matches!(ext.as_str(), "ttf" | "otf")
}

//! Project manifest loading (`cpship.toml`).
//!
//! Every section is optional; a project with no manifest at all deploys with
//! the defaults below, which reproduce the conventional CircuitPython layout
//! (`src/`, `lib/`, `modules/`, `fonts/`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub project: ProjectConfig,
    pub source: SourceConfig,
    pub lib: LibConfig,
    pub fonts: FontConfig,
    pub lint: LintConfig,
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory holding the program files, relative to the project root.
    pub dir: PathBuf,
    /// File within `dir` that boots the board; installed as `code.py`.
    pub entry: String,
    /// Regex patterns matched against relative paths; matches are not deployed.
    pub exclude: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("src"),
            entry: "code.py".to_string(),
            exclude: vec![
                "__pycache__".to_string(),
                r"\.pyc$".to_string(),
                r"(^|/)\.".to_string(),
            ],
        }
    }
}

impl SourceConfig {
    pub fn compiled_excludes(&self) -> Result<Vec<Regex>> {
        self.exclude
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("invalid exclude pattern: {p}")))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibConfig {
    /// Tree of driver packages, copied recursively under `<mount>/lib`.
    pub bundle_dir: PathBuf,
    /// Flat directory of standalone `.py`/`.mpy` modules, also landing in `<mount>/lib`.
    pub module_dir: PathBuf,
}

impl Default for LibConfig {
    fn default() -> Self {
        Self {
            bundle_dir: PathBuf::from("lib"),
            module_dir: PathBuf::from("modules"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Directory holding the TrueType inputs.
    pub dir: PathBuf,
    /// Regular face filename within `dir`.
    pub regular: String,
    /// Bold face filename within `dir`, if the project ships one.
    pub bold: Option<String>,
    /// Point sizes to render; each face/size pair becomes one PCF.
    pub sizes: Vec<u32>,
    /// Directory on the device that the firmware loads PCFs from.
    pub device_dir: PathBuf,
    /// Staging directory for BDF/PCF artifacts, relative to the project root.
    pub build_dir: PathBuf,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("fonts"),
            regular: "DejaVuSansMono.ttf".to_string(),
            bold: Some("DejaVuSansMono-Bold.ttf".to_string()),
            sizes: vec![8, 12, 18, 24, 30],
            device_dir: PathBuf::from("font"),
            build_dir: PathBuf::from("build/fonts"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Extra search-path roots beyond the source and library directories.
    pub extra_paths: Vec<PathBuf>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            program: "pylint".to_string(),
            args: Vec::new(),
            extra_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Fixed mount path, overriding discovery.
    pub mount: Option<PathBuf>,
}

impl Manifest {
    /// Load a manifest, treating a missing file as an empty one.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let manifest: Manifest = toml::from_str(&raw)
            .with_context(|| format!("parsing manifest {}", path.display()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fonts.sizes.is_empty() {
            return Err(anyhow!("fonts.sizes must list at least one point size"));
        }
        if self.fonts.sizes.iter().any(|s| *s == 0) {
            return Err(anyhow!("fonts.sizes entries must be nonzero"));
        }

        for (label, dir) in [
            ("source.dir", &self.source.dir),
            ("lib.bundle_dir", &self.lib.bundle_dir),
            ("lib.module_dir", &self.lib.module_dir),
            ("fonts.dir", &self.fonts.dir),
            ("fonts.device_dir", &self.fonts.device_dir),
            ("fonts.build_dir", &self.fonts.build_dir),
        ] {
            if dir.is_absolute() {
                return Err(anyhow!("{label} must be relative to the project root"));
            }
        }

        self.source.compiled_excludes()?;
        Ok(())
    }
}

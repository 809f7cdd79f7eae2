//! cpship CLI: deploy CircuitPython projects to a mounted board.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use cpship_core::device;
use cpship_core::fonts;
use cpship_core::lint;
use cpship_core::manifest::Manifest;
use cpship_core::report::{write_json_pretty, write_ndjson};
use cpship_core::sync::{self, CopyOutcome, CopyRecord, SyncOptions};

mod logger;

/// CLI entrypoint for cpship.
#[derive(Debug, Parser)]
#[command(
    name = "cpship",
    about = "Deploy CircuitPython projects to a mounted board"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lint, then install source, libraries and fonts
    All(DeployArgs),
    /// Install source files (the entry file becomes code.py)
    Install(DeployArgs),
    /// Install the library bundle and standalone modules
    InstallLib(DeployArgs),
    /// Convert fonts and install the PCFs
    InstallFonts(DeployArgs),
    /// Run the linter over the project search path
    Lint(LintArgs),
}

#[derive(Debug, Args)]
struct DeployArgs {
    /// Project manifest path
    #[arg(long = "manifest", default_value = "cpship.toml", value_hint = ValueHint::FilePath)]
    manifest: PathBuf,

    /// Deploy target (defaults to the discovered CIRCUITPY mount)
    #[arg(long = "mount", value_hint = ValueHint::DirPath)]
    mount: Option<PathBuf>,

    /// Plan without writing to the device
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Copy files even when the device copy looks current
    #[arg(long = "force", action = ArgAction::SetTrue)]
    force: bool,

    /// Worker threads for the freshness scan
    #[arg(short = 'j', long = "jobs")]
    jobs: Option<usize>,

    /// Emit the report as a single JSON array
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit the report as newline-delimited JSON
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,

    /// Control colorized output (auto|always|never)
    #[arg(long = "color", default_value_t = ColorChoice::Auto, value_enum)]
    color: ColorChoice,
}

#[derive(Debug, Args)]
struct LintArgs {
    /// Project manifest path
    #[arg(long = "manifest", default_value = "cpship.toml", value_hint = ValueHint::FilePath)]
    manifest: PathBuf,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Step {
    Source,
    Library,
    Fonts,
    Everything,
}

/// Parse CLI args, execute the selected command, and return the process exit
/// code. Lint exit codes pass through from the linter itself.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match cli.command {
        Command::All(args) => run_all(args),
        Command::Install(args) => run_deploy(args, Step::Source),
        Command::InstallLib(args) => run_deploy(args, Step::Library),
        Command::InstallFonts(args) => run_deploy(args, Step::Fonts),
        Command::Lint(args) => run_lint(args),
    }
}

fn run_all(args: DeployArgs) -> Result<i32> {
    let manifest = Manifest::load(&args.manifest)?;
    let root = project_root(&args.manifest);

    let status = lint::run(&manifest, &root)?;
    if !status.success() {
        tracing::warn!("lint failed; skipping install");
        return Ok(exit_code(status));
    }

    deploy(&manifest, &root, &args, Step::Everything)
}

fn run_deploy(args: DeployArgs, step: Step) -> Result<i32> {
    let manifest = Manifest::load(&args.manifest)?;
    let root = project_root(&args.manifest);
    deploy(&manifest, &root, &args, step)
}

fn run_lint(args: LintArgs) -> Result<i32> {
    let manifest = Manifest::load(&args.manifest)?;
    let root = project_root(&args.manifest);
    let status = lint::run(&manifest, &root)?;
    Ok(exit_code(status))
}

fn deploy(manifest: &Manifest, root: &Path, args: &DeployArgs, step: Step) -> Result<i32> {
    let mount = resolve_mount(args, manifest)?;

    if !manifest.project.name.is_empty() {
        tracing::info!("deploying {} to {}", manifest.project.name, mount.display());
    }

    let mut plan = Vec::new();
    if matches!(step, Step::Source | Step::Everything) {
        plan.extend(sync::plan_source(manifest, root, &mount)?);
    }
    if matches!(step, Step::Library | Step::Everything) {
        plan.extend(sync::plan_lib(manifest, root, &mount)?);
    }
    if matches!(step, Step::Fonts | Step::Everything) {
        let built = fonts::build(&manifest.fonts, root, args.force)?;
        plan.extend(sync::plan_fonts(manifest, &built, &mount));
    }

    tracing::debug!("planned {} actions for {}", plan.len(), mount.display());

    let opts = SyncOptions {
        dry_run: args.dry_run,
        force: args.force,
        jobs: args.jobs,
    };
    let records = sync::execute(&plan, &opts)?;

    write_report(&records, args)?;
    Ok(0)
}

/// Explicit `--mount` beats the manifest's `[device] mount`, which beats
/// platform discovery.
fn resolve_mount(args: &DeployArgs, manifest: &Manifest) -> Result<PathBuf> {
    let configured = args.mount.clone().or_else(|| manifest.device.mount.clone());
    device::resolve_mount(configured.as_deref())
}

fn project_root(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

fn write_report(records: &[CopyRecord], args: &DeployArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let use_color = match args.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => handle.is_terminal(),
    };

    if args.ndjson {
        write_ndjson(records, &mut handle)?;
    } else if args.json {
        write_json_pretty(records, &mut handle)?;
    } else {
        write_plain(records, &mut handle, use_color)?;
    }

    Ok(())
}

fn write_plain(records: &[CopyRecord], mut w: impl Write, color: bool) -> Result<()> {
    for record in records {
        let verb = match record.outcome {
            CopyOutcome::Copied => "installed",
            CopyOutcome::UpToDate => "up-to-date",
            CopyOutcome::WouldCopy => "would install",
        };
        let padded = format!("{verb:>13}");
        let rendered = apply_color(&padded, color, outcome_color(record.outcome));

        writeln!(w, "{rendered}  {}", record.dest.display())?;
    }

    let copied = count(records, CopyOutcome::Copied);
    let current = count(records, CopyOutcome::UpToDate);
    writeln!(
        w,
        "{copied} installed, {current} already current, {} planned",
        records.len()
    )?;

    Ok(())
}

fn count(records: &[CopyRecord], outcome: CopyOutcome) -> usize {
    records.iter().filter(|r| r.outcome == outcome).count()
}

#[derive(Copy, Clone)]
enum AnsiColor {
    Green,
    Cyan,
    Yellow,
}

fn outcome_color(outcome: CopyOutcome) -> AnsiColor {
    match outcome {
        CopyOutcome::Copied => AnsiColor::Green,
        CopyOutcome::UpToDate => AnsiColor::Cyan,
        CopyOutcome::WouldCopy => AnsiColor::Yellow,
    }
}

fn apply_color(text: &str, color: bool, code: AnsiColor) -> String {
    if !color {
        return text.to_string();
    }

    let code_str = match code {
        AnsiColor::Green => "32",
        AnsiColor::Cyan => "36",
        AnsiColor::Yellow => "33",
    };

    format!("\u{1b}[{}m{}\u{1b}[0m", code_str, text)
}

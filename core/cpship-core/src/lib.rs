//! cpship-core: deployment engine for CircuitPython projects.
//!
//! A CircuitPython board shows up as a small FAT volume (`CIRCUITPY`) and a
//! project ships by landing the right files on it: the program as `code.py`,
//! driver libraries under `lib/`, and bitmap fonts where the firmware expects
//! them. This crate implements that pipeline; the `cpship` CLI is a thin
//! front-end over it.
//!
//! - [`manifest`]: the `cpship.toml` project description, defaults included.
//! - [`device`]: finding and sanity-checking the mounted board.
//! - [`discovery`]: enumerating deployable files.
//! - [`sync`]: planning copies and executing them with make-style freshness.
//! - [`fonts`]: the TTF → BDF → PCF pipeline driven through `otf2bdf` and
//!   `bdftopcf`.
//! - [`lint`]: running a linter with the project's module search path.
//! - [`report`]: JSON/NDJSON rendering of what a deploy did.
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use cpship_core::manifest::Manifest;
//! use cpship_core::sync::{self, SyncOptions};
//! use cpship_core::device;
//!
//! let manifest = Manifest::load(Path::new("cpship.toml"))?;
//! let mount = device::resolve_mount(None)?;
//!
//! let mut plan = sync::plan_source(&manifest, Path::new("."), &mount)?;
//! plan.extend(sync::plan_lib(&manifest, Path::new("."), &mount)?);
//!
//! let records = sync::execute(&plan, &SyncOptions::default())?;
//! println!("{} files considered", records.len());
//! #
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Failure semantics follow the build scripts this replaces: copies and lint
//! propagate errors, font conversion is allowed to fail quietly.

pub mod device;
pub mod discovery;
pub mod fonts;
pub mod lint;
pub mod manifest;
pub mod report;
pub mod sync;

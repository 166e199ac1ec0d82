//! # CLI Behavior
//!
//! This is **one possible UI client** for supporg. It is the only place that
//! knows about terminal I/O, exit codes and output formatting; see the crate
//! docs of the library for the layers underneath.
//!
//! ## Naked Execution
//!
//! Running `supporg` with no arguments shows today's plan, same as
//! `supporg plan show`.
//!
//! ## Selectors
//!
//! Supplements are referenced by their position in `item list` (`3`, `2-4`),
//! by id, or by exact name (case-insensitive). Slots take a position in
//! `slot list`, an id, or a name.
//!
//! ## Data Directory
//!
//! `$SUPPORG_DATA` when set, else the platform data dir. Logging goes to
//! stderr, filtered by `$SUPPORG_LOG` (default `warn`, `--verbose` for
//! `debug`).
//!
//! ## Module Structure
//!
//! - `commands`: dispatch and per-command handlers
//! - `render`: output formatting
//! - `setup`: argument parsing via clap

mod commands;
mod render;
pub mod setup;

pub use commands::run;

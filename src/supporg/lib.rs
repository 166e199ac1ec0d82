//! # Supporg Architecture
//!
//! Supporg is a **local-first supplements organizer library**: a catalog of
//! supplements, a per-date plan of daily slots, pairwise interaction rules,
//! appointments, and an offline cache for the static resources of its UI.
//! The `supporg` binary is one client of it, not the application itself.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Owns the document, the current date and slot selection   │
//! │  - Resolves selectors (positions, names) into ids           │
//! │  - Persists after every mutation                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Pure business logic over a Document                      │
//! │  - No I/O, no clock reads for "today"                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - DocumentStore trait                                      │
//! │  - FileStore (production), InMemoryStore (testing)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resource cache ([`cache`]) and the weather snapshot ([`weather`]) sit
//! beside this stack. They share no state with the document.
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes Rust arguments and returns Rust types. It
//! never writes to stdout/stderr and never calls `std::process::exit`.
//! Diagnostics go through `tracing`; the binary decides where they end up.
//!
//! ## Testing Strategy
//!
//! 1. **Commands**: thorough unit tests of the business logic.
//! 2. **API**: dispatch, persistence and selection state over `InMemoryStore`.
//! 3. **CLI**: `tests/cli.rs` drives the binary against a temporary data dir.
//!
//! ## Module Overview
//!
//! - [`api`]: the facade, entry point for all document operations
//! - [`commands`]: business logic per concern
//! - [`store`]: document persistence
//! - [`model`]: core data types (`Document`, `Supplement`, `Slot`, `Rule`)
//! - [`selector`]: position / id / name resolution
//! - [`cache`]: versioned offline resource cache
//! - [`weather`]: saved city and last weather snapshot
//! - [`config`]: configuration management
//! - [`init`]: data dir resolution and context setup
//! - [`error`]: error types
//! - `cli`: argument parsing and printing for the binary (not part of the lib API)

pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod init;
pub mod model;
pub mod selector;
pub mod store;
pub mod weather;

#[cfg(test)]
pub mod test_utils;

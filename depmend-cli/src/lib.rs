//! Depmend CLI library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `depmend-cli` is used as a binary (main.rs).

pub mod cli;
pub mod logging;
pub mod orchestrator;
pub mod process;

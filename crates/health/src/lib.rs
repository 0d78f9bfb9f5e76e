#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`HealthError`)
//! - [`config`]: Auditor configuration (`HealthCheckConfig`, builder)
//! - [`checks`]: Per-manifest checks (`HealthChecker`: lockfile, staleness, advisories)
//! - [`environment`]: Environment probes (`EnvironmentProbe` trait, tooling/disk/reachability)
//! - [`score`]: Deterministic scoring and overall status derivation
//! - [`report`]: Report assembly and JSON persistence (`write_report`)

pub mod checks;
pub mod config;
pub mod environment;
pub mod error;
pub mod report;
pub mod score;

// --- Public API Re-exports ---

// Configuration
pub use config::{HealthCheckConfig, HealthCheckConfigBuilder};

// Error
pub use error::HealthError;

// Checks
pub use checks::HealthChecker;

// Environment
pub use environment::{DynEnvironmentProbe, EnvironmentProbe, environment_checks};

// Score
pub use score::{compute_score, derive_overall};

// Report
pub use report::{build_recommendations, write_report};

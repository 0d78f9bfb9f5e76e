#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`RemedyError`)
//! - [`config`]: Engine configuration (`RemediationConfig`, builder)
//! - [`detect`]: Conflict detection (`ConflictDetector`, `DetectionOutput`)
//! - [`backup`]: Backup store (`BackupStore`, `BackupRecord`)
//! - [`command`]: Injected validation capabilities (`ValidationCommand` trait)
//! - [`engine`]: Remediation engine (`RemediationEngine`, per-manifest state machine)
//!
//! # Architecture
//!
//! ```text
//! declarations --> ConflictDetector --> Vec<Conflict> + resolved versions
//!                                              |
//!                                      RemediationEngine
//!                                              |
//!                  BackupStore --> mutate --> lock regen --> validate
//!                       ^                                       |
//!                       +----------- rollback on failure -------+
//! ```

pub mod backup;
pub mod command;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;

// --- Public API Re-exports ---

// Configuration
pub use config::{RemediationConfig, RemediationConfigBuilder};

// Error
pub use error::RemedyError;

// Detection
pub use detect::{ConflictDetector, DetectionOutput};

// Backup
pub use backup::{BackupRecord, BackupStore};

// Commands
pub use command::{CommandOutcome, DynValidationCommand, EcosystemCommands, ValidationCommand};

// Engine
pub use engine::{ManifestPlan, RemediationEngine};

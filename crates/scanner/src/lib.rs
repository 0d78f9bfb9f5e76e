#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ScannerError`)
//! - [`config`]: Scanner configuration (`ScannerConfig`, builder)
//! - [`detector`]: Manifest filename classification (`ManifestDetector`)
//! - [`walker`]: Source-tree walk (`ManifestScanner`, `ScanOutput`)
//! - [`adapter`]: Per-ecosystem adapters (`ManifestAdapter` trait, npm/cargo/pip/pipenv/go)
//!
//! # Architecture
//!
//! ```text
//! scan root --> ManifestDetector --> Vec<ManifestFile>
//!                                          |
//!                                   ManifestAdapter::parse
//!                                          |
//!                                 Vec<DependencyDeclaration>
//! ```

pub mod adapter;
pub mod config;
pub mod detector;
pub mod error;
pub mod walker;

// --- Public API Re-exports ---

// Configuration
pub use config::{ScannerConfig, ScannerConfigBuilder};

// Error
pub use error::ScannerError;

// Detector
pub use detector::ManifestDetector;

// Walker
pub use walker::{ManifestScanner, ScanOutput};

// Adapters
pub use adapter::cargo::CargoAdapter;
pub use adapter::go::GoAdapter;
pub use adapter::npm::NpmAdapter;
pub use adapter::python::{PipAdapter, PipenvAdapter};
pub use adapter::{ManifestAdapter, adapter_for, default_adapters};

#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`RegistryError`)
//! - [`config`]: Client configuration (`RegistryClientConfig`, builder)
//! - [`client`]: Resolver capability (`RegistryResolver` trait, `HttpRegistryClient`)
//! - [`cache`]: Run-scoped memoization (`CachedResolver`, `DiskCache`)
//! - [`advisory`]: Local advisory database (`AdvisoryDb`, `AdvisoryEntry`)
//! - [`version`]: Version comparison and range matching
//!
//! # Architecture
//!
//! ```text
//! caller --> CachedResolver --> (run cache hit?) --> ResolveOutcome
//!                  |                                      ^
//!                  +--> DiskCache (TTL) --> HttpRegistryClient
//! ```

pub mod advisory;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod version;

// --- Public API Re-exports ---

// Configuration
pub use config::{RegistryClientConfig, RegistryClientConfigBuilder};

// Error
pub use error::RegistryError;

// Client
pub use client::{
    BoxFuture, DynRegistryResolver, HttpRegistryClient, RegistryResolver, ResolveOutcome,
};

// Cache
pub use cache::CachedResolver;

// Advisory
pub use advisory::{AdvisoryDb, AdvisoryEntry, VersionRange};

//! fadogen_build
//!
//! Build support crate for the Fadogen static PHP pipeline. The pipeline
//! builds standalone PHP binaries per version line with static-php-cli; this
//! crate provides the pieces the workflow scripts around that build need:
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and types
//! - **patcher**: Phase-gated rewrite of the php-src INI scan directory lookup
//! - **config**: Hook configuration and environment reconciliation
//! - **metadata**: Build ledger (version planning, checksums, EOL cleanup)
//! - **logging**: Decoupled log collector wired to the `log` facade

// Core foundational modules
pub mod error;
pub mod models;

// Source patching hook
pub mod patcher;

// Hook configuration
pub mod config;

// Build metadata ledger
pub mod metadata;

// Robust, decoupled logging system
pub mod logging;

// Re-export the log crate for macro usage
pub use log;

// Re-export error types for easy access
pub use error::{ConfigError, MetadataError, PatchError, Result};

// Re-export model types for easy access
pub use models::{
    MissingPatternPolicy,
    PatchPoint,
    PatchReport,
    PatchStrategy,
    PhpVersion,
    SubstitutionKind,
    SubstitutionOutcome,
    SubstitutionRule,
    VersionSource,
};

// Re-export the patch hook
pub use patcher::{IniScanPatcher, TARGET_RELATIVE_PATH};

// Re-export config types
pub use config::{HookConfig, SHORT_VERSION_ENV};

// Re-export logging initialization
pub use logging::{initialize_logging, LogCollector, LogLine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

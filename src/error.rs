//! Unified error type hierarchy for fadogen_build
//!
//! Provides structured error handling with PatchError, ConfigError, and
//! MetadataError.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Source patching operation errors.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Patch target file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to write patched file {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Expected pattern not found in {}: {pattern}", .file.display())]
    PatternNotFound { file: PathBuf, pattern: String },

    #[error("IO error while patching: {0}")]
    IoError(#[from] io::Error),
}

/// Hook configuration parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Conflicting settings detected: {0}")]
    ConflictDetected(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Build metadata ledger errors.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in metadata: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid checksum line (expected version,os,sha512,filename): {0}")]
    ChecksumFormat(String),

    #[error("No checksum found for {0} - build incomplete")]
    ChecksumMissing(String),

    #[error("IO error during metadata operations: {0}")]
    IoError(#[from] io::Error),
}

/// Top-level result type for operations that may fail.
/// Use this as the return type for all fallible functions.
/// Example: `fn risky_operation() -> Result<String>`
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

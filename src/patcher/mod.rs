//! PHP Source Patching Module
//!
//! Rewrites `php-src/main/php_ini.c` during a static-php-cli build so the
//! runtime consults a version-scoped INI scan directory variable instead of
//! the global `PHP_INI_SCAN_DIR`:
//! - Pure content transforms with replacement counting
//! - C helper templates for the injected lookup function
//! - The phase-gated hook that applies the rewrite to the source tree

// Pure string rewriting primitives
pub mod rewrite;

// Injected C snippet templates
pub mod templates;

// Phase-gated patch hook
pub mod hook;

pub use hook::{IniScanPatcher, TARGET_RELATIVE_PATH};

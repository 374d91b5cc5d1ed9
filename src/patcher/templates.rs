//! C snippet templates for the INI scan directory rewrite.
//!
//! The injected helper replaces every `getenv("PHP_INI_SCAN_DIR")` call site so
//! a machine running several PHP version lines side by side can point each one
//! at its own scan directory. Two renditions exist: one resolves the variable
//! name at C compile time from the php-src version macros, the other bakes in
//! the literal name from a build-provided short version.

use crate::models::{PhpVersion, VersionSource};

/// Name of the injected lookup helper. Doubles as the idempotence guard: a
/// source already containing it has been patched by an earlier run.
pub const HELPER_FUNCTION_NAME: &str = "getenv_fadogen_php_ini_scan_dir";

/// Call expression substituted at the original lookup sites.
pub const HELPER_CALL: &str = "getenv_fadogen_php_ini_scan_dir()";

/// Include line the helper definition is anchored to.
pub const INCLUDE_ANCHOR: &str = "#include \"php_ini.h\"";

/// The lookup expression php-src ships with.
pub const ORIGINAL_LOOKUP: &str = "getenv(\"PHP_INI_SCAN_DIR\")";

/// The bare string literal, for the rename-only strategy.
pub const ORIGINAL_LITERAL: &str = "\"PHP_INI_SCAN_DIR\"";

/// Render the helper definition for the given version source.
pub fn helper_function(source: VersionSource) -> String {
    match source {
        VersionSource::CompileTimeMacros => format!(
            r#"
#include "php_version.h"

/* Fadogen: each PHP version line reads its own INI scan directory variable */
static char* {name}()
{{
	char var_name[64];
	sprintf(var_name, "FADOGEN_PHP_%d%d_INI_SCAN_DIR", PHP_MAJOR_VERSION, PHP_MINOR_VERSION);
	return getenv(var_name);
}}
"#,
            name = HELPER_FUNCTION_NAME
        ),
        VersionSource::ShortVersion(version) => format!(
            r#"
/* Fadogen: PHP {version} reads its own INI scan directory variable */
static char* {name}()
{{
	return getenv("{var}");
}}
"#,
            version = version,
            name = HELPER_FUNCTION_NAME,
            var = version.env_var_name()
        ),
    }
}

/// The versioned string literal (with quotes) for the rename-only strategy.
pub fn versioned_literal(version: PhpVersion) -> String {
    format!("\"{}\"", version.env_var_name())
}

//! Core data types for fadogen_build.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Variable names injected into C sources must stay plain tokens.
static ENV_TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9_]+$").expect("Invalid env token regex"));

/// Short version forms accepted from config or environment: "8.2" or compact "82".
static SHORT_VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9])(?:\.([0-9]{1,2})|([0-9]{1,2}))$").expect("Invalid short version regex"));

/// static-php-cli patch point.
///
/// The build orchestrator invokes source patches at named pipeline stages; the
/// INI scan directory rewrite only acts at `before-php-buildconf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchPoint {
    BeforePhpBuildconf,
    BeforePhpConfigure,
    BeforePhpMake,
}

impl PatchPoint {
    /// All patch points the pipeline is known to emit.
    pub fn all() -> &'static [PatchPoint] {
        &[
            PatchPoint::BeforePhpBuildconf,
            PatchPoint::BeforePhpConfigure,
            PatchPoint::BeforePhpMake,
        ]
    }

    /// The phase string as the orchestrator spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchPoint::BeforePhpBuildconf => "before-php-buildconf",
            PatchPoint::BeforePhpConfigure => "before-php-configure",
            PatchPoint::BeforePhpMake => "before-php-make",
        }
    }
}

impl fmt::Display for PatchPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PatchPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "before-php-buildconf" => Ok(PatchPoint::BeforePhpBuildconf),
            "before-php-configure" => Ok(PatchPoint::BeforePhpConfigure),
            "before-php-make" => Ok(PatchPoint::BeforePhpMake),
            _ => Err(format!(
                "Unknown patch point '{}'. Valid values: before-php-buildconf, before-php-configure, before-php-make",
                s
            )),
        }
    }
}

/// How the INI scan directory rewrite is expressed in the patched source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStrategy {
    /// Insert a C helper next to the includes and redirect every
    /// `getenv("PHP_INI_SCAN_DIR")` call site to it.
    InjectFunction,
    /// Rewrite the bare `"PHP_INI_SCAN_DIR"` string literal to the versioned name.
    RenameLiteralOnly,
}

impl Default for PatchStrategy {
    fn default() -> Self {
        PatchStrategy::InjectFunction
    }
}

impl fmt::Display for PatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchStrategy::InjectFunction => write!(f, "inject-function"),
            PatchStrategy::RenameLiteralOnly => write!(f, "rename-literal"),
        }
    }
}

impl FromStr for PatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inject-function" | "inject_function" => Ok(PatchStrategy::InjectFunction),
            "rename-literal" | "rename_literal_only" => Ok(PatchStrategy::RenameLiteralOnly),
            _ => Err(format!(
                "Unknown patch strategy '{}'. Valid values: inject-function, rename-literal",
                s
            )),
        }
    }
}

/// What to do when a substitution's expected pattern is absent from the target.
///
/// Upstream php-src drifts between releases, so the default only warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPatternPolicy {
    Warn,
    Fail,
}

impl Default for MissingPatternPolicy {
    fn default() -> Self {
        MissingPatternPolicy::Warn
    }
}

impl FromStr for MissingPatternPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warn" => Ok(MissingPatternPolicy::Warn),
            "fail" => Ok(MissingPatternPolicy::Fail),
            _ => Err(format!("Unknown missing-pattern policy '{}'. Valid values: warn, fail", s)),
        }
    }
}

/// PHP version line being built (major.minor, never patch level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhpVersion {
    pub major: u8,
    pub minor: u8,
}

impl PhpVersion {
    pub fn new(major: u8, minor: u8) -> Self {
        PhpVersion { major, minor }
    }

    /// Parse a build-provided short version: `"8.2"`, or the compact `"82"` form
    /// that `SPC_PHP_VERSION_SHORT` carries (first digit major, remainder minor).
    pub fn parse_short(s: &str) -> Result<Self, String> {
        let caps = SHORT_VERSION_REGEX
            .captures(s.trim())
            .ok_or_else(|| format!("Unrecognized PHP short version '{}'", s))?;

        let major: u8 = caps[1]
            .parse()
            .map_err(|_| format!("Invalid major version in '{}'", s))?;
        let minor_str = caps
            .get(2)
            .or_else(|| caps.get(3))
            .ok_or_else(|| format!("Missing minor version in '{}'", s))?;
        let minor: u8 = minor_str
            .as_str()
            .parse()
            .map_err(|_| format!("Invalid minor version in '{}'", s))?;

        if major < 5 {
            return Err(format!("PHP major version {} is not buildable", major));
        }
        Ok(PhpVersion { major, minor })
    }

    /// The version-scoped environment variable consulted by the patched runtime.
    pub fn env_var_name(&self) -> String {
        format!("FADOGEN_PHP_{}{}_INI_SCAN_DIR", self.major, self.minor)
    }

    /// Compact form as the pipeline spells it, e.g. `82`.
    pub fn short(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }
}

impl fmt::Display for PhpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PhpVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhpVersion::parse_short(s)
    }
}

/// Check that an injected variable name is a plain `[A-Z0-9_]` token.
pub fn is_valid_env_token(name: &str) -> bool {
    ENV_TOKEN_REGEX.is_match(name)
}

/// Where the injected helper learns the version it scopes the variable name to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    /// Defer to `PHP_MAJOR_VERSION`/`PHP_MINOR_VERSION` at C compile time.
    CompileTimeMacros,
    /// Bake the literal name from a build-provided short version.
    ShortVersion(PhpVersion),
}

/// One textual edit against the target source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubstitutionKind {
    /// Insert `block` immediately after the first line containing `anchor`.
    InsertAfter { anchor: String, block: String },
    /// Replace every literal occurrence of `needle` with `replacement`.
    ReplaceAll { needle: String, replacement: String },
}

/// A substitution rule plus its idempotence guard.
///
/// When `guard` is already present in the file the rule was applied by an
/// earlier run and is skipped without touching the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRule {
    pub label: String,
    pub kind: SubstitutionKind,
    pub guard: Option<String>,
}

/// Result of applying one substitution rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstitutionOutcome {
    pub label: String,          // Rule
    pub replacements: u32,      // Count
    pub skipped_existing: bool, // Guard hit
    pub pattern_missing: bool,  // Absent
}

/// Result of one hook invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchReport {
    /// Whether the invocation phase was the one this hook acts at.
    pub point_matched: bool,
    pub outcomes: Vec<SubstitutionOutcome>,
}

impl PatchReport {
    /// New report for a matched patch point.
    pub fn matched() -> Self {
        PatchReport {
            point_matched: true,
            outcomes: Vec::new(),
        }
    }

    /// New report for a phase the hook ignores.
    pub fn skipped() -> Self {
        PatchReport::default()
    }

    pub fn total_replacements(&self) -> u32 {
        self.outcomes.iter().map(|o| o.replacements).sum()
    }

    /// True when the invocation changed nothing on disk.
    pub fn is_noop(&self) -> bool {
        !self.point_matched || self.outcomes.iter().all(|o| o.replacements == 0)
    }
}

//! Phase-gated patch hook for the INI scan directory rewrite.
//!
//! The build orchestrator invokes this once per patch point; only
//! `before-php-buildconf` triggers work. Each substitution rule runs as its own
//! read, rewrite, write pass over the target file, so the rules stay
//! independent: a rule whose pattern has drifted out of upstream php-src never
//! reverts an edit an earlier rule already persisted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, PatchError};
use crate::models::{
    MissingPatternPolicy, PatchPoint, PatchReport, PatchStrategy, SubstitutionKind,
    SubstitutionOutcome, SubstitutionRule, VersionSource,
};
use crate::patcher::{rewrite, templates};

/// Result type for patching operations
pub type PatchResult<T> = std::result::Result<T, PatchError>;

/// Location of the INI machinery inside a php-src checkout.
pub const TARGET_RELATIVE_PATH: &str = "php-src/main/php_ini.c";

/// Rewrites the INI scan directory lookup in a php-src checkout.
///
/// All collaborator state arrives through the constructor; the hook itself
/// holds no globals and touches exactly one file.
pub struct IniScanPatcher {
    /// Root of the build checkout containing `php-src/`
    source_root: PathBuf,
    strategy: PatchStrategy,
    version_source: VersionSource,
    missing_pattern: MissingPatternPolicy,
}

impl IniScanPatcher {
    /// Create a patcher for the given checkout.
    ///
    /// Rejects the one inconsistent combination up front: the rename-only
    /// strategy has no compile-time fallback and needs an explicit version.
    pub fn new(
        source_root: impl Into<PathBuf>,
        strategy: PatchStrategy,
        version_source: VersionSource,
        missing_pattern: MissingPatternPolicy,
    ) -> Result<Self, ConfigError> {
        if strategy == PatchStrategy::RenameLiteralOnly
            && version_source == VersionSource::CompileTimeMacros
        {
            return Err(ConfigError::ValidationFailed(
                "rename-literal strategy requires an explicit PHP version".to_string(),
            ));
        }

        Ok(IniScanPatcher {
            source_root: source_root.into(),
            strategy,
            version_source,
            missing_pattern,
        })
    }

    /// Absolute path of the file this hook may rewrite.
    pub fn target_path(&self) -> PathBuf {
        self.source_root.join(TARGET_RELATIVE_PATH)
    }

    /// Apply the rewrite if `point` is the stage this hook acts at.
    ///
    /// Any other patch point is a clean no-op that leaves the target file
    /// byte-for-byte untouched. Re-running against an already patched file is
    /// also a no-op: the injected helper name doubles as the applied marker.
    pub fn apply(&self, point: PatchPoint) -> PatchResult<PatchReport> {
        if point != PatchPoint::BeforePhpBuildconf {
            log::debug!(
                "[Patcher] Skipping INI scan rewrite at {} (acts at {})",
                point,
                PatchPoint::BeforePhpBuildconf
            );
            return Ok(PatchReport::skipped());
        }

        let path = self.target_path();
        let content = read_target(&path)?;
        let already_patched = content.contains(self.applied_marker().as_str());
        if already_patched {
            log::info!(
                "[Patcher] {} already carries the versioned INI scan lookup",
                path.display()
            );
        }

        let mut report = PatchReport::matched();
        for rule in self.rules() {
            let outcome = self.apply_rule(&path, &rule, !already_patched)?;
            report.outcomes.push(outcome);
        }

        log::info!(
            "[Patcher] INI scan rewrite finished: {} replacement(s) across {} rule(s)",
            report.total_replacements(),
            report.outcomes.len()
        );
        Ok(report)
    }

    /// Literal whose presence marks the file as patched by an earlier run.
    fn applied_marker(&self) -> String {
        match self.strategy {
            PatchStrategy::InjectFunction => templates::HELPER_FUNCTION_NAME.to_string(),
            PatchStrategy::RenameLiteralOnly => templates::versioned_literal(self.rename_version()),
        }
    }

    /// The explicit version the rename-only strategy carries.
    fn rename_version(&self) -> crate::models::PhpVersion {
        match self.version_source {
            VersionSource::ShortVersion(version) => version,
            // The constructor rejects rename-literal without an explicit version.
            VersionSource::CompileTimeMacros => {
                unreachable!("rename-literal strategy validated to carry an explicit version")
            }
        }
    }

    fn rules(&self) -> Vec<SubstitutionRule> {
        match self.strategy {
            PatchStrategy::InjectFunction => vec![
                SubstitutionRule {
                    label: "inject-ini-scan-helper".to_string(),
                    kind: SubstitutionKind::InsertAfter {
                        anchor: templates::INCLUDE_ANCHOR.to_string(),
                        block: templates::helper_function(self.version_source),
                    },
                    guard: Some(templates::HELPER_FUNCTION_NAME.to_string()),
                },
                SubstitutionRule {
                    label: "redirect-ini-scan-lookup".to_string(),
                    kind: SubstitutionKind::ReplaceAll {
                        needle: templates::ORIGINAL_LOOKUP.to_string(),
                        replacement: templates::HELPER_CALL.to_string(),
                    },
                    guard: None,
                },
            ],
            PatchStrategy::RenameLiteralOnly => {
                let version = self.rename_version();
                vec![SubstitutionRule {
                    label: "rename-ini-scan-literal".to_string(),
                    kind: SubstitutionKind::ReplaceAll {
                        needle: templates::ORIGINAL_LITERAL.to_string(),
                        replacement: templates::versioned_literal(version),
                    },
                    guard: Some(templates::versioned_literal(version)),
                }]
            }
        }
    }

    /// One read, rewrite, write pass for a single rule.
    ///
    /// `expect_pattern` is false when the file was recognized as already
    /// patched, so a zero-count pass is a clean skip rather than drift.
    fn apply_rule(
        &self,
        path: &Path,
        rule: &SubstitutionRule,
        expect_pattern: bool,
    ) -> PatchResult<SubstitutionOutcome> {
        let content = read_target(path)?;

        if let Some(guard) = &rule.guard {
            if content.contains(guard.as_str()) {
                log::debug!("[Patcher] {}: already applied, skipping", rule.label);
                return Ok(SubstitutionOutcome {
                    label: rule.label.clone(),
                    replacements: 0,
                    skipped_existing: true,
                    pattern_missing: false,
                });
            }
        }

        let (pattern, new_content, count) = match &rule.kind {
            SubstitutionKind::InsertAfter { anchor, block } => {
                match rewrite::insert_after_line_containing(&content, anchor, block) {
                    Some(patched) => (anchor, patched, 1),
                    None => (anchor, content.clone(), 0),
                }
            }
            SubstitutionKind::ReplaceAll { needle, replacement } => {
                let (patched, count) = rewrite::replace_all_literal(&content, needle, replacement);
                (needle, patched, count)
            }
        };

        if count == 0 {
            if expect_pattern {
                if self.missing_pattern == MissingPatternPolicy::Fail {
                    return Err(PatchError::PatternNotFound {
                        file: path.to_path_buf(),
                        pattern: pattern.clone(),
                    });
                }
                log::warn!(
                    "[Patcher] {}: expected pattern not found in {} (upstream drift?): {}",
                    rule.label,
                    path.display(),
                    pattern
                );
            }
            return Ok(SubstitutionOutcome {
                label: rule.label.clone(),
                replacements: 0,
                skipped_existing: false,
                pattern_missing: expect_pattern,
            });
        }

        if new_content != content {
            fs::write(path, &new_content).map_err(|e| PatchError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        log::info!("[Patcher] {}: {} replacement(s)", rule.label, count);
        Ok(SubstitutionOutcome {
            label: rule.label.clone(),
            replacements: count,
            skipped_existing: false,
            pattern_missing: false,
        })
    }
}

/// Read the patch target, distinguishing a missing file from other IO failures.
fn read_target(path: &Path) -> PatchResult<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            PatchError::FileNotFound(path.display().to_string())
        } else {
            PatchError::IoError(e)
        }
    })
}

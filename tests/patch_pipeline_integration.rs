//! End-to-end tests for the INI scan directory rewrite.
//!
//! Exercises the whole hook path the way the build pipeline drives it: resolve
//! configuration against the environment value, construct the patcher, run it
//! at a patch point, and inspect the rewritten php-src fixture.

use std::fs;
use std::path::{Path, PathBuf};

use fadogen_build::config::HookConfig;
use fadogen_build::models::{
    MissingPatternPolicy, PatchPoint, PatchStrategy, PhpVersion, VersionSource,
};
use fadogen_build::patcher::IniScanPatcher;
use fadogen_build::PatchError;

/// Trimmed php_ini.c with the two sites the rewrite touches.
const PHP_INI_FIXTURE: &str = r#"/*
   +----------------------------------------------------------------------+
   | Copyright (c) The PHP Group                                          |
   +----------------------------------------------------------------------+
*/

#include "php.h"
#include "php_ini.h"
#include "ext/standard/info.h"
#include "zend_ini.h"

int php_init_config(void)
{
	char *php_ini_search_path = NULL;
	char *env_location = getenv("PHP_INI_SCAN_DIR");

	if (!env_location) {
		env_location = "";
	}
	return 0;
}
"#;

fn write_fixture(root: &Path) -> PathBuf {
    let main_dir = root.join("php-src/main");
    fs::create_dir_all(&main_dir).expect("Failed to create php-src tree");
    let target = main_dir.join("php_ini.c");
    fs::write(&target, PHP_INI_FIXTURE).expect("Failed to write fixture");
    target
}

/// Build a patcher the way the CLI does: config resolved against the
/// pipeline's short-version value.
fn patcher_from_env(root: &Path, config: HookConfig, env_short: Option<&str>) -> IniScanPatcher {
    let version_source = config
        .version_source(env_short)
        .expect("version resolution should succeed");
    IniScanPatcher::new(
        root,
        config.strategy,
        version_source,
        config.on_missing_pattern,
    )
    .expect("valid patcher configuration")
}

#[test]
fn pipeline_short_version_83_injects_versioned_helper() {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    let target = write_fixture(temp.path());

    let patcher = patcher_from_env(temp.path(), HookConfig::default(), Some("83"));
    let report = patcher.apply(PatchPoint::BeforePhpBuildconf).unwrap();

    assert!(report.point_matched);
    assert_eq!(report.total_replacements(), 2);

    let patched = fs::read_to_string(&target).unwrap();
    // Exactly one helper definition, referencing the version-scoped variable
    assert_eq!(
        patched
            .matches("static char* getenv_fadogen_php_ini_scan_dir")
            .count(),
        1
    );
    assert!(patched.contains("getenv(\"FADOGEN_PHP_83_INI_SCAN_DIR\")"));
    // The original call site now goes through the helper
    assert!(patched.contains("env_location = getenv_fadogen_php_ini_scan_dir();"));
    assert_eq!(patched.matches("getenv(\"PHP_INI_SCAN_DIR\")").count(), 0);
}

#[test]
fn pipeline_without_version_defers_to_compile_time_macros() {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    let target = write_fixture(temp.path());

    let patcher = patcher_from_env(temp.path(), HookConfig::default(), None);
    patcher.apply(PatchPoint::BeforePhpBuildconf).unwrap();

    let patched = fs::read_to_string(&target).unwrap();
    assert!(patched.contains("#include \"php_version.h\""));
    assert!(patched.contains("PHP_MAJOR_VERSION, PHP_MINOR_VERSION"));
    assert!(patched.contains("FADOGEN_PHP_%d%d_INI_SCAN_DIR"));
    assert_eq!(patched.matches("getenv(\"PHP_INI_SCAN_DIR\")").count(), 0);
}

#[test]
fn pipeline_rerun_produces_identical_file() {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    let target = write_fixture(temp.path());

    let patcher = patcher_from_env(temp.path(), HookConfig::default(), Some("82"));
    patcher.apply(PatchPoint::BeforePhpBuildconf).unwrap();
    let after_first = fs::read_to_string(&target).unwrap();

    // A fresh patcher over the same tree, as a retried CI job would create
    let retry = patcher_from_env(temp.path(), HookConfig::default(), Some("82"));
    let report = retry.apply(PatchPoint::BeforePhpBuildconf).unwrap();
    let after_second = fs::read_to_string(&target).unwrap();

    assert_eq!(after_first, after_second);
    assert!(report.is_noop());
}

#[test]
fn pipeline_other_patch_points_do_not_touch_the_tree() {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    let target = write_fixture(temp.path());

    let patcher = patcher_from_env(temp.path(), HookConfig::default(), Some("82"));
    for point in [PatchPoint::BeforePhpConfigure, PatchPoint::BeforePhpMake] {
        let report = patcher.apply(point).unwrap();
        assert!(!report.point_matched);
    }
    assert_eq!(fs::read_to_string(&target).unwrap(), PHP_INI_FIXTURE);
}

#[test]
fn pipeline_rename_literal_strategy_rewrites_literal_in_place() {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    let target = write_fixture(temp.path());

    let config = HookConfig {
        strategy: PatchStrategy::RenameLiteralOnly,
        ..Default::default()
    };
    let patcher = patcher_from_env(temp.path(), config, Some("8.2"));
    let report = patcher.apply(PatchPoint::BeforePhpBuildconf).unwrap();
    assert_eq!(report.total_replacements(), 1);

    let patched = fs::read_to_string(&target).unwrap();
    assert!(patched.contains("getenv(\"FADOGEN_PHP_82_INI_SCAN_DIR\")"));
    assert!(!patched.contains("\"PHP_INI_SCAN_DIR\""));
    assert!(!patched.contains("static char* getenv_fadogen"));
}

#[test]
fn pipeline_drifted_source_warns_and_still_redirects_call_sites() {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    // Upstream moved the include we anchor on
    let drifted = PHP_INI_FIXTURE.replace("#include \"php_ini.h\"\n", "");
    let main_dir = temp.path().join("php-src/main");
    fs::create_dir_all(&main_dir).unwrap();
    let target = main_dir.join("php_ini.c");
    fs::write(&target, &drifted).unwrap();

    let patcher = patcher_from_env(temp.path(), HookConfig::default(), Some("83"));
    let report = patcher.apply(PatchPoint::BeforePhpBuildconf).unwrap();

    assert!(report.outcomes[0].pattern_missing);
    assert_eq!(report.outcomes[1].replacements, 1);
    let patched = fs::read_to_string(&target).unwrap();
    assert!(patched.contains("getenv_fadogen_php_ini_scan_dir()"));
}

#[test]
fn pipeline_missing_checkout_aborts_without_writing() {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    let patcher = patcher_from_env(temp.path(), HookConfig::default(), Some("83"));

    let result = patcher.apply(PatchPoint::BeforePhpBuildconf);
    assert!(matches!(result, Err(PatchError::FileNotFound(_))));
    // Nothing materialized under the root
    assert!(!temp.path().join("php-src").exists());
}

#[test]
fn pipeline_version_conflict_is_rejected_before_patching() {
    let config = HookConfig {
        php_version: Some("8.2".to_string()),
        ..Default::default()
    };
    // Workflow matrix says 8.2 but the build environment says 8.3
    let result = config.version_source(Some("83"));
    assert!(result.is_err());
}

#[test]
fn pipeline_every_supported_short_version_gets_its_own_variable() {
    for short in ["74", "80", "81", "82", "83", "84"] {
        let temp = tempfile::tempdir().expect("Failed to create temp directory");
        let target = write_fixture(temp.path());

        let patcher = patcher_from_env(temp.path(), HookConfig::default(), Some(short));
        patcher.apply(PatchPoint::BeforePhpBuildconf).unwrap();

        let patched = fs::read_to_string(&target).unwrap();
        let expected = format!("FADOGEN_PHP_{}_INI_SCAN_DIR", short);
        assert_eq!(
            patched
                .matches("static char* getenv_fadogen_php_ini_scan_dir")
                .count(),
            1,
            "short version {}",
            short
        );
        assert!(patched.contains(&expected), "short version {}", short);
        assert_eq!(
            patched.matches("getenv(\"PHP_INI_SCAN_DIR\")").count(),
            0,
            "short version {}",
            short
        );
    }
}

#[test]
fn pipeline_helper_variants_agree_on_call_surface() {
    // Whichever variant is injected, the redirected call sites stay identical,
    // so the strategy can change between releases without touching call sites.
    let temp_a = tempfile::tempdir().expect("Failed to create temp directory");
    let temp_b = tempfile::tempdir().expect("Failed to create temp directory");
    let target_a = write_fixture(temp_a.path());
    let target_b = write_fixture(temp_b.path());

    IniScanPatcher::new(
        temp_a.path(),
        PatchStrategy::InjectFunction,
        VersionSource::CompileTimeMacros,
        MissingPatternPolicy::Warn,
    )
    .unwrap()
    .apply(PatchPoint::BeforePhpBuildconf)
    .unwrap();
    IniScanPatcher::new(
        temp_b.path(),
        PatchStrategy::InjectFunction,
        VersionSource::ShortVersion(PhpVersion::new(8, 3)),
        MissingPatternPolicy::Warn,
    )
    .unwrap()
    .apply(PatchPoint::BeforePhpBuildconf)
    .unwrap();

    let call_line = |path: &Path| -> String {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .find(|l| l.contains("env_location = "))
            .unwrap()
            .to_string()
    };
    assert_eq!(call_line(&target_a), call_line(&target_b));
}

//! Integration tests for the metadata ledger workflow.
//!
//! Walks the same sequence the CI workflow runs: plan builds from a PHP.watch
//! snapshot, record the finished builds with checksums, then purge EOL
//! versions, with every artifact on disk.

use chrono::{TimeZone, Utc};
use std::fs;

use fadogen_build::metadata::{
    self, archive_filename, build_timestamp, BuildMetadata,
};

/// PHP.watch style snapshot: one active version, one EOL, one future.
const API_FIXTURE: &str = r#"{
  "data": {
    "80300": {
      "name": "8.3",
      "versionId": 80300,
      "releaseDate": "2023-11-23",
      "activeSupportEndDate": "2025-12-31",
      "eolDate": "2027-12-31",
      "isEOLVersion": false,
      "isSecureVersion": true,
      "isLatestVersion": true,
      "isFutureVersion": false,
      "isNextVersion": false
    },
    "80000": {
      "name": "8.0",
      "versionId": 80000,
      "releaseDate": "2020-11-26",
      "activeSupportEndDate": "2022-11-26",
      "eolDate": "2023-11-26",
      "isEOLVersion": true,
      "isSecureVersion": false,
      "isLatestVersion": false,
      "isFutureVersion": false,
      "isNextVersion": false
    },
    "80500": {
      "name": "8.5",
      "versionId": 80500,
      "releaseDate": "2025-11-20",
      "activeSupportEndDate": null,
      "eolDate": null,
      "isEOLVersion": false,
      "isSecureVersion": false,
      "isLatestVersion": false,
      "isFutureVersion": true,
      "isNextVersion": true
    }
  }
}"#;

#[test]
fn full_ledger_cycle_plan_record_cleanup() {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    let metadata_path = temp.path().join("metadata.json");
    let api_path = temp.path().join("api_response.json");
    let output_path = temp.path().join("github_output.txt");
    fs::write(&api_path, API_FIXTURE).unwrap();

    // Seed the ledger with the version that has since gone EOL
    let mut seeded = BuildMetadata::default();
    let api = metadata::load_api_response(&api_path).unwrap();
    let eol_fields = api
        .data
        .values()
        .find(|v| v.name == "8.0")
        .unwrap()
        .fields
        .clone();
    seeded.versions.insert(
        "8.0".to_string(),
        metadata::VersionEntry {
            fields: eol_fields,
            builds: Default::default(),
        },
    );
    metadata::save_metadata(&seeded, &metadata_path).unwrap();

    // Step 1: plan
    let ledger = metadata::load_or_default(&metadata_path).unwrap();
    let plan = metadata::plan_builds(&ledger, &api);
    assert!(plan.should_build());
    // 8.3 is new, 8.0 is EOL (never scheduled), 8.5 is future (never scheduled)
    assert_eq!(plan.targets.len(), 1);
    assert_eq!(plan.targets[0].php_version, "8.3");
    assert_eq!(plan.eol_versions, vec!["8.0".to_string()]);

    metadata::write_github_output(&plan, &output_path).unwrap();
    let output = fs::read_to_string(&output_path).unwrap();
    assert!(output.contains("should-build=true"));

    // Step 2: record the finished build
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let timestamp = build_timestamp(now);
    let filename = archive_filename("8.3", "macos-aarch64", &timestamp);
    let checksums = format!("8.3,macos-aarch64,deadbeef,{}", filename);

    let mut ledger = metadata::load_or_default(&metadata_path).unwrap();
    metadata::record_builds(&mut ledger, &plan.targets, &checksums, now).unwrap();
    metadata::save_metadata(&ledger, &metadata_path).unwrap();

    let reloaded = metadata::load_metadata(&metadata_path).unwrap();
    let build = &reloaded.versions["8.3"].builds["macos-aarch64"];
    assert_eq!(build.filename, "php-8.3-20250601120000-macos-aarch64.tar.xz");
    assert_eq!(build.sha512, "deadbeef");

    // Step 3: cleanup the EOL line
    let mut ledger = metadata::load_metadata(&metadata_path).unwrap();
    let removed = metadata::remove_eol(&mut ledger, &plan.eol_versions);
    assert_eq!(removed, 1);
    metadata::save_metadata(&ledger, &metadata_path).unwrap();

    let final_ledger = metadata::load_metadata(&metadata_path).unwrap();
    assert!(!final_ledger.versions.contains_key("8.0"));
    assert!(final_ledger.versions.contains_key("8.3"));
}

#[test]
fn planning_is_stable_once_ledger_is_current() {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    let api_path = temp.path().join("api_response.json");
    fs::write(&api_path, API_FIXTURE).unwrap();
    let api = metadata::load_api_response(&api_path).unwrap();

    // First pass schedules 8.3; record it and plan again
    let mut ledger = BuildMetadata::default();
    let plan = metadata::plan_builds(&ledger, &api);
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let checksums = "8.3,macos-aarch64,deadbeef,php-8.3.tar.xz";
    metadata::record_builds(&mut ledger, &plan.targets, checksums, now).unwrap();

    let second = metadata::plan_builds(&ledger, &api);
    assert!(!second.should_build());
}

#[test]
fn matrix_json_round_trips_through_github_output_shape() {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    let api_path = temp.path().join("api_response.json");
    let output_path = temp.path().join("github_output.txt");
    fs::write(&api_path, API_FIXTURE).unwrap();
    let api = metadata::load_api_response(&api_path).unwrap();

    let plan = metadata::plan_builds(&BuildMetadata::default(), &api);
    metadata::write_github_output(&plan, &output_path).unwrap();

    // The workflow feeds the matrix= line back into update-metadata
    let output = fs::read_to_string(&output_path).unwrap();
    let matrix_line = output
        .lines()
        .find(|l| l.starts_with("matrix="))
        .expect("matrix line present");
    let matrix_json = matrix_line.trim_start_matches("matrix=");

    #[derive(serde::Deserialize)]
    struct Envelope {
        include: Vec<metadata::BuildTarget>,
    }
    let envelope: Envelope = serde_json::from_str(matrix_json).unwrap();
    assert_eq!(envelope.include.len(), 1);
    assert_eq!(envelope.include[0].php_version, "8.3");
    assert_eq!(envelope.include[0].runs_on, "macos-latest");
    assert_eq!(envelope.include[0].fields.version_id, 80300);
}

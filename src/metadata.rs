//! Build metadata ledger for published PHP binaries.
//!
//! The CI workflow keeps a `metadata.json` describing every PHP version line it
//! has built and published. This module owns that ledger end to end: deciding
//! which versions need a (re)build from a PHP.watch API snapshot, recording
//! finished builds with their archive checksums, and purging version lines that
//! reached end of life.

use crate::error::MetadataError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

/// OS targets the pipeline builds for, with their GitHub Actions runners.
pub const SUPPORTED_TARGETS: &[(&str, &str)] = &[("macos-aarch64", "macos-latest")];

/// Version lifecycle fields mirrored from the PHP.watch API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionFields {
    #[serde(rename = "versionId")]
    pub version_id: u32,
    #[serde(rename = "releaseDate")]
    pub release_date: String,
    #[serde(rename = "activeSupportEndDate")]
    pub active_support_end_date: Option<String>,
    #[serde(rename = "eolDate")]
    pub eol_date: Option<String>,
    #[serde(rename = "isEOLVersion")]
    pub is_eol_version: bool,
    #[serde(rename = "isSecureVersion")]
    pub is_secure_version: bool,
    #[serde(rename = "isLatestVersion")]
    pub is_latest_version: bool,
    #[serde(rename = "isFutureVersion")]
    pub is_future_version: bool,
    #[serde(rename = "isNextVersion")]
    pub is_next_version: bool,
}

/// One version entry in the PHP.watch API payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiVersion {
    pub name: String,
    #[serde(flatten)]
    pub fields: VersionFields,
}

/// The PHP.watch API response, as fetched by the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub data: BTreeMap<String, ApiVersion>,
}

/// A published build of one version line on one OS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub filename: String,
    pub sha512: String,
    pub last_build: String,
}

/// Ledger entry for one PHP version line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntry {
    #[serde(flatten)]
    pub fields: VersionFields,
    #[serde(default)]
    pub builds: BTreeMap<String, BuildRecord>,
}

/// The `metadata.json` ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildMetadata {
    #[serde(default)]
    pub last_sync: String,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionEntry>,
}

/// One row of the workflow build matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildTarget {
    #[serde(rename = "php-version")]
    pub php_version: String,
    pub os: String,
    #[serde(rename = "runs-on")]
    pub runs_on: String,
    #[serde(flatten)]
    pub fields: VersionFields,
}

/// Outcome of comparing the ledger against the API snapshot.
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    pub targets: Vec<BuildTarget>,
    pub eol_versions: Vec<String>,
}

impl BuildPlan {
    pub fn should_build(&self) -> bool {
        !self.targets.is_empty()
    }
}

/// Load the ledger, failing when the file is absent.
pub fn load_metadata(path: &Path) -> Result<BuildMetadata, MetadataError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MetadataError::FileNotFound(path.display().to_string())
        } else {
            MetadataError::IoError(e)
        }
    })?;
    let metadata: BuildMetadata = serde_json::from_str(&content)?;
    Ok(metadata)
}

/// Load the ledger, starting empty when the file does not exist yet.
pub fn load_or_default(path: &Path) -> Result<BuildMetadata, MetadataError> {
    match load_metadata(path) {
        Ok(metadata) => Ok(metadata),
        Err(MetadataError::FileNotFound(_)) => Ok(BuildMetadata::default()),
        Err(e) => Err(e),
    }
}

/// Save the ledger with pretty formatting.
pub fn save_metadata(metadata: &BuildMetadata, path: &Path) -> Result<(), MetadataError> {
    let content = serde_json::to_string_pretty(metadata)?;
    fs::write(path, content).map_err(MetadataError::IoError)?;
    Ok(())
}

/// Load a PHP.watch API snapshot from disk.
pub fn load_api_response(path: &Path) -> Result<ApiResponse, MetadataError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MetadataError::FileNotFound(path.display().to_string())
        } else {
            MetadataError::IoError(e)
        }
    })?;
    let response: ApiResponse = serde_json::from_str(&content)?;
    Ok(response)
}

/// Compare the ledger against the API snapshot.
///
/// A version line needs building when it is new to the ledger or the API
/// carries a newer release date (a point release shipped). EOL and future
/// versions are never scheduled; ledger entries the API now marks EOL are
/// flagged for cleanup.
pub fn plan_builds(metadata: &BuildMetadata, api: &ApiResponse) -> BuildPlan {
    let mut plan = BuildPlan::default();

    for version in api.data.values() {
        if version.fields.is_eol_version || version.fields.is_future_version {
            continue;
        }

        let need_build = match metadata.versions.get(&version.name) {
            None => {
                log::info!("[Metadata] New version detected: {}", version.name);
                true
            }
            Some(entry) => {
                // Release dates are ISO dates; lexicographic order is date order
                if version.fields.release_date > entry.fields.release_date {
                    log::info!(
                        "[Metadata] Updated version detected: {} ({} > {})",
                        version.name,
                        version.fields.release_date,
                        entry.fields.release_date
                    );
                    true
                } else {
                    false
                }
            }
        };

        if need_build {
            for (os, runner) in SUPPORTED_TARGETS {
                plan.targets.push(BuildTarget {
                    php_version: version.name.clone(),
                    os: (*os).to_string(),
                    runs_on: (*runner).to_string(),
                    fields: version.fields.clone(),
                });
            }
        }
    }

    for name in metadata.versions.keys() {
        let went_eol = api
            .data
            .values()
            .any(|v| &v.name == name && v.fields.is_eol_version);
        if went_eol {
            log::info!("[Metadata] EOL version detected: {}", name);
            plan.eol_versions.push(name.clone());
        }
    }

    plan
}

/// Write the plan as GitHub Actions output lines.
pub fn write_github_output(plan: &BuildPlan, path: &Path) -> Result<(), MetadataError> {
    let matrix = serde_json::to_string(&serde_json::json!({ "include": plan.targets }))?;
    let eol = serde_json::to_string(&plan.eol_versions)?;

    let mut file = fs::File::create(path).map_err(MetadataError::IoError)?;
    writeln!(file, "matrix={}", matrix).map_err(MetadataError::IoError)?;
    writeln!(file, "eol={}", eol).map_err(MetadataError::IoError)?;
    writeln!(
        file,
        "should-build={}",
        if plan.should_build() { "true" } else { "false" }
    )
    .map_err(MetadataError::IoError)?;
    Ok(())
}

/// Parse `version,os,sha512,filename` checksum lines, keyed by `version-os`.
///
/// The format is strict: every non-empty line must carry all four fields.
fn parse_checksums(raw: &str) -> Result<BTreeMap<String, (String, String)>, MetadataError> {
    let mut checksums = BTreeMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != 4 {
            return Err(MetadataError::ChecksumFormat(line.to_string()));
        }
        let key = format!("{}-{}", parts[0], parts[1]);
        checksums.insert(key, (parts[2].to_string(), parts[3].to_string()));
    }
    Ok(checksums)
}

/// Record finished builds into the ledger.
///
/// Every matrix row must have a matching checksum line; a missing one means the
/// workflow published an incomplete build set and the update is aborted before
/// any entry changes.
pub fn record_builds(
    metadata: &mut BuildMetadata,
    matrix: &[BuildTarget],
    checksums_raw: &str,
    now: DateTime<Utc>,
) -> Result<(), MetadataError> {
    let checksums = parse_checksums(checksums_raw)?;
    let stamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);

    // Validate up front so a missing checksum never leaves a half-updated ledger
    for target in matrix {
        let key = format!("{}-{}", target.php_version, target.os);
        if !checksums.contains_key(&key) {
            return Err(MetadataError::ChecksumMissing(key));
        }
    }

    metadata.last_sync = stamp.clone();

    for target in matrix {
        let key = format!("{}-{}", target.php_version, target.os);
        let (sha512, filename) = checksums
            .get(&key)
            .cloned()
            .ok_or(MetadataError::ChecksumMissing(key.clone()))?;

        let entry = metadata
            .versions
            .entry(target.php_version.clone())
            .and_modify(|entry| entry.fields = target.fields.clone())
            .or_insert_with(|| VersionEntry {
                fields: target.fields.clone(),
                builds: BTreeMap::new(),
            });

        entry.builds.insert(
            target.os.clone(),
            BuildRecord {
                filename,
                sha512,
                last_build: stamp.clone(),
            },
        );
    }

    log::info!(
        "[Metadata] Updated metadata for {} PHP versions",
        metadata.versions.len()
    );
    Ok(())
}

/// Drop end-of-life version lines from the ledger.
pub fn remove_eol(metadata: &mut BuildMetadata, eol_versions: &[String]) -> usize {
    let mut removed = 0;
    for version in eol_versions {
        if metadata.versions.remove(version).is_some() {
            log::info!("[Metadata] Removed {} from metadata", version);
            removed += 1;
        }
    }
    removed
}

/// Archive name for a published build. Single source of truth for naming.
pub fn archive_filename(php_version: &str, os: &str, timestamp: &str) -> String {
    format!("php-{}-{}-{}.tar.xz", php_version, timestamp, os)
}

/// Build timestamp in the compact form the archive names embed.
pub fn build_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fadogen_build::config::{self, HookConfig, SHORT_VERSION_ENV};
use fadogen_build::metadata;
use fadogen_build::models::{MissingPatternPolicy, PatchPoint, PatchStrategy};
use fadogen_build::patcher::IniScanPatcher;

#[derive(Parser)]
#[command(name = "fadogen_build")]
#[command(version, about = "Fadogen static PHP build support")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for persisted run logs (stderr is always used)
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite the php-src INI scan directory lookup at a build patch point
    Patch {
        /// Patch point the orchestrator is at, e.g. before-php-buildconf
        #[arg(long)]
        phase: PatchPoint,

        /// Root of the build checkout containing php-src/
        #[arg(long)]
        source_root: PathBuf,

        /// Override the rewrite strategy
        #[arg(long)]
        strategy: Option<PatchStrategy>,

        /// Explicit PHP version line, e.g. 8.3 or 83
        #[arg(long)]
        php_version: Option<String>,

        /// What to do when an expected pattern is absent
        #[arg(long)]
        on_missing: Option<MissingPatternPolicy>,

        /// Optional JSON hook configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Compare the metadata ledger against a PHP.watch API snapshot
    CheckVersions {
        #[arg(long, default_value = "metadata.json")]
        metadata: PathBuf,

        #[arg(long, default_value = "api_response.json")]
        api_response: PathBuf,

        /// Where to write the GitHub Actions output lines
        #[arg(long, default_value = "github_output.txt")]
        output: PathBuf,
    },
    /// Record finished builds into the metadata ledger
    UpdateMetadata {
        #[arg(long, default_value = "metadata.json")]
        metadata: PathBuf,

        /// JSON build matrix as emitted by check-versions
        #[arg(long)]
        build_matrix: String,

        /// Checksum lines: version,os,sha512,filename
        #[arg(long)]
        archive_checksums: String,
    },
    /// Remove end-of-life versions from the metadata ledger
    CleanupEol {
        #[arg(long, default_value = "metadata.json")]
        metadata: PathBuf,

        /// JSON array of version names, e.g. ["8.0","7.4"]
        #[arg(long)]
        eol_versions: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging first: everything after this point reports through the collector
    let collector = fadogen_build::initialize_logging(cli.log_dir.clone(), cli.verbose);

    let result = run(cli);

    // Drain the log queue before the process exits either way
    collector.flush();
    result
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Patch {
            phase,
            source_root,
            strategy,
            php_version,
            on_missing,
            config: config_path,
        } => {
            let mut hook_config = match config_path {
                Some(path) => config::load_config_from_file(&path)
                    .with_context(|| format!("Failed to load hook config {}", path.display()))?,
                None => HookConfig::default(),
            };
            if let Some(strategy) = strategy {
                hook_config.strategy = strategy;
            }
            if let Some(version) = php_version {
                hook_config.php_version = Some(version);
            }
            if let Some(policy) = on_missing {
                hook_config.on_missing_pattern = policy;
            }

            let env_short = std::env::var(SHORT_VERSION_ENV).ok();
            let version_source = hook_config.version_source(env_short.as_deref())?;

            let patcher = IniScanPatcher::new(
                source_root,
                hook_config.strategy,
                version_source,
                hook_config.on_missing_pattern,
            )?;
            let report = patcher
                .apply(phase)
                .context("INI scan directory rewrite failed")?;

            if report.point_matched {
                log::info!(
                    "Patch applied: {} replacement(s)",
                    report.total_replacements()
                );
            } else {
                log::info!("Nothing to do at patch point {}", phase);
            }
            Ok(())
        }
        Commands::CheckVersions {
            metadata: metadata_path,
            api_response,
            output,
        } => {
            let ledger = metadata::load_or_default(&metadata_path)?;
            let api = metadata::load_api_response(&api_response)
                .with_context(|| format!("Failed to load {}", api_response.display()))?;

            let plan = metadata::plan_builds(&ledger, &api);
            log::info!("Build matrix: {} items", plan.targets.len());
            log::info!("EOL versions: {} items", plan.eol_versions.len());

            metadata::write_github_output(&plan, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            Ok(())
        }
        Commands::UpdateMetadata {
            metadata: metadata_path,
            build_matrix,
            archive_checksums,
        } => {
            let mut ledger = metadata::load_or_default(&metadata_path)?;
            let matrix: MatrixEnvelope =
                serde_json::from_str(&build_matrix).context("Invalid build matrix JSON")?;

            metadata::record_builds(&mut ledger, &matrix.include, &archive_checksums, Utc::now())?;
            metadata::save_metadata(&ledger, &metadata_path)
                .with_context(|| format!("Failed to save {}", metadata_path.display()))?;
            Ok(())
        }
        Commands::CleanupEol {
            metadata: metadata_path,
            eol_versions,
        } => {
            let mut ledger = metadata::load_metadata(&metadata_path)?;
            let versions: Vec<String> =
                serde_json::from_str(&eol_versions).context("Invalid EOL versions JSON")?;

            let removed = metadata::remove_eol(&mut ledger, &versions);
            metadata::save_metadata(&ledger, &metadata_path)
                .with_context(|| format!("Failed to save {}", metadata_path.display()))?;
            log::info!("Removed {} EOL versions from metadata", removed);
            Ok(())
        }
    }
}

/// The `{"include": [...]}` envelope GitHub Actions matrices use.
#[derive(serde::Deserialize)]
struct MatrixEnvelope {
    include: Vec<metadata::BuildTarget>,
}

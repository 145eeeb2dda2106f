use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ballot::RegistrationPolicy;

/// Main configuration structure for Ballot Box
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BallotBoxConfig {
    /// Settings applied when a new ballot is created
    pub ballot: BallotConfig,
    /// Snapshot storage settings
    pub storage: StorageConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BallotConfig {
    /// Administrator address for newly created ballots
    pub admin: String,
    /// Whether voters may be registered after the registration phase
    pub registration_policy: RegistrationPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path to the ballot snapshot file
    pub state_file_path: PathBuf,
    /// Verify the snapshot hash on every load
    pub enable_integrity_checks: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit structured JSON logs instead of compact text
    pub json_logs: bool,
}

impl Default for BallotBoxConfig {
    fn default() -> Self {
        Self {
            ballot: BallotConfig {
                admin: "admin".to_string(),
                registration_policy: RegistrationPolicy::AnyPhase,
            },
            storage: StorageConfig {
                state_file_path: PathBuf::from(".ballot-box/ballot.json"),
                enable_integrity_checks: true,
            },
            observability: ObservabilityConfig {
                log_level: "warn".to_string(),
                json_logs: false,
            },
        }
    }
}

impl BallotBoxConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (ballot-box.toml, .ballot-box-rc)
    /// 3. Environment variables (BALLOT_BOX_<SECTION>__<KEY>)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("ballot-box.toml").exists() {
            builder = builder.add_source(File::with_name("ballot-box"));
        }

        if Path::new(".ballot-box-rc").exists() {
            builder = builder.add_source(
                File::with_name(".ballot-box-rc").format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("BALLOT_BOX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load defaults overlaid with a single TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path.as_ref()).format(config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load `.env` from the working directory if present
    pub fn load_env_file() -> Result<Option<PathBuf>> {
        Self::load_env_file_from(".env")
    }

    /// Load environment variables from `path`, returning the path when a file was read
    pub fn load_env_file_from<P: AsRef<Path>>(path: P) -> Result<Option<PathBuf>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        dotenvy::from_path(path)?;
        Ok(Some(path.to_path_buf()))
    }
}

/// Outcome of reading `.env`, kept until logging is up
static ENV_FILE: std::sync::LazyLock<Result<Option<PathBuf>, String>> =
    std::sync::LazyLock::new(|| BallotBoxConfig::load_env_file().map_err(|e| e.to_string()));

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<BallotBoxConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // .env must be applied before the environment source is read
        std::sync::LazyLock::force(&ENV_FILE);
        BallotBoxConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static BallotBoxConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Report how `.env` was handled. Call after telemetry is initialized.
pub fn log_env_file_status() {
    log_env_file_outcome(&ENV_FILE);
}

fn log_env_file_outcome(outcome: &Result<Option<PathBuf>, String>) {
    match outcome {
        Ok(Some(path)) => tracing::info!(file = ?path, "Loaded environment variables from .env file"),
        Ok(None) => {}
        Err(error) => tracing::warn!(error = %error, "Ignoring unreadable .env file"),
    }
}

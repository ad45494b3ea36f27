//! Configuration module
//!
//! Pipeline settings loaded from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const MAX_MODEL_SIZE_MB_PRODUCTION: u64 = 500;
const MAX_MODEL_SIZE_MB_DEVELOPMENT: u64 = 100;
const SMALL_FILE_WARNING_BYTES: u64 = 100;
const ENTROPY_THRESHOLD: f64 = 7.5;
const SCAN_TEXT_PREFIX_BYTES: usize = 10 * 1024;
const SESSION_RETENTION_HOURS: u64 = 24;
const SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;
const STAGE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_STORAGE_PATH: &str = "./storage";

/// Ingestion pipeline configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub environment: String,
    pub max_file_size_bytes: u64,
    pub small_file_warning_bytes: u64,
    /// Shannon entropy (bits/byte) above which content is flagged.
    pub entropy_threshold: f64,
    /// Leading bytes searched for suspicious text patterns.
    pub scan_text_prefix_bytes: usize,
    pub storage_backend: StorageBackend,
    pub storage_path: PathBuf,
    pub session_retention_hours: u64,
    /// 0 disables the background sweeper.
    pub session_sweep_interval_secs: u64,
    pub stage_timeout_secs: u64,
    pub require_security_scan: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            max_file_size_bytes: MAX_MODEL_SIZE_MB_DEVELOPMENT * 1024 * 1024,
            small_file_warning_bytes: SMALL_FILE_WARNING_BYTES,
            entropy_threshold: ENTROPY_THRESHOLD,
            scan_text_prefix_bytes: SCAN_TEXT_PREFIX_BYTES,
            storage_backend: StorageBackend::Local,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            session_retention_hours: SESSION_RETENTION_HOURS,
            session_sweep_interval_secs: SESSION_SWEEP_INTERVAL_SECS,
            stage_timeout_secs: STAGE_TIMEOUT_SECS,
            require_security_scan: true,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let default_max_mb = if is_production_env(&environment) {
            MAX_MODEL_SIZE_MB_PRODUCTION
        } else {
            MAX_MODEL_SIZE_MB_DEVELOPMENT
        };
        let max_model_size_mb = env::var("MAX_MODEL_SIZE_MB")
            .unwrap_or_else(|_| default_max_mb.to_string())
            .parse::<u64>()
            .unwrap_or(default_max_mb);

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Local,
        };

        let config = Self {
            environment,
            max_file_size_bytes: max_model_size_mb * 1024 * 1024,
            small_file_warning_bytes: env::var("SMALL_FILE_WARNING_BYTES")
                .unwrap_or_else(|_| SMALL_FILE_WARNING_BYTES.to_string())
                .parse()
                .unwrap_or(SMALL_FILE_WARNING_BYTES),
            entropy_threshold: env::var("ENTROPY_THRESHOLD")
                .unwrap_or_else(|_| ENTROPY_THRESHOLD.to_string())
                .parse()
                .unwrap_or(ENTROPY_THRESHOLD),
            scan_text_prefix_bytes: env::var("SCAN_TEXT_PREFIX_BYTES")
                .unwrap_or_else(|_| SCAN_TEXT_PREFIX_BYTES.to_string())
                .parse()
                .unwrap_or(SCAN_TEXT_PREFIX_BYTES),
            storage_backend,
            storage_path: env::var("MODEL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_PATH)),
            session_retention_hours: env::var("SESSION_RETENTION_HOURS")
                .unwrap_or_else(|_| SESSION_RETENTION_HOURS.to_string())
                .parse()
                .unwrap_or(SESSION_RETENTION_HOURS),
            session_sweep_interval_secs: env::var("SESSION_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| SESSION_SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(SESSION_SWEEP_INTERVAL_SECS),
            stage_timeout_secs: env::var("STAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| STAGE_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(STAGE_TIMEOUT_SECS),
            require_security_scan: env::var("REQUIRE_SECURITY_SCAN")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_MODEL_SIZE_MB must be greater than 0"));
        }

        if self.small_file_warning_bytes >= self.max_file_size_bytes {
            return Err(anyhow::anyhow!(
                "SMALL_FILE_WARNING_BYTES must be smaller than the maximum model size"
            ));
        }

        if !(0.0..=8.0).contains(&self.entropy_threshold) {
            return Err(anyhow::anyhow!(
                "ENTROPY_THRESHOLD must be between 0 and 8 bits per byte"
            ));
        }

        if self.scan_text_prefix_bytes == 0 {
            return Err(anyhow::anyhow!(
                "SCAN_TEXT_PREFIX_BYTES must be greater than 0"
            ));
        }

        if self.stage_timeout_secs == 0 {
            return Err(anyhow::anyhow!("STAGE_TIMEOUT_SECS must be greater than 0"));
        }

        if self.is_production() && !self.require_security_scan {
            return Err(anyhow::anyhow!(
                "REQUIRE_SECURITY_SCAN cannot be disabled in production"
            ));
        }

        Ok(())
    }

    /// Check if the pipeline is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.environment)
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    pub fn session_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_retention_hours as i64)
    }
}

fn is_production_env(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

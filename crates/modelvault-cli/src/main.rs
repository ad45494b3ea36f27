//! modelvault CLI: run the ingestion pipeline against local files.
//!
//! Configuration comes from the environment (see `IngestConfig::from_env`).
//! Every command prints its result as JSON.

use anyhow::Context;
use clap::{Parser, Subcommand};
use modelvault_cli::{original_name, print_json, spool_copy};
use modelvault_core::{IngestConfig, UploadOptions};
use modelvault_ingest::telemetry::init_telemetry;
use modelvault_ingest::UploadOrchestrator;
use modelvault_processing::{
    ArtifactScanner, ScanPolicy, SecurityScanner, SizePolicy, ValidationCoordinator,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modelvault", about = "Model artifact ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, scan and store a model file
    Ingest {
        /// Path to the model file
        file: PathBuf,
        /// Encrypt the stored artifact with a fresh key
        #[arg(long)]
        encrypt: bool,
        /// Skip the security scan (ignored when REQUIRE_SECURITY_SCAN is set)
        #[arg(long)]
        skip_scan: bool,
        /// Model name recorded with the upload
        #[arg(long)]
        name: Option<String>,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },
    /// Run size, format and checksum validation only
    Validate {
        /// Path to the model file
        file: PathBuf,
    },
    /// Run the security scanner only
    Scan {
        /// Path to the model file
        file: PathBuf,
    },
    /// Read a stored artifact back, decrypting it if a key is given
    Retrieve {
        /// Storage path returned by `ingest`
        storage_path: String,
        /// Output file
        #[arg(long, short)]
        output: PathBuf,
        /// Base64 encryption key returned by `ingest`
        #[arg(long)]
        key: Option<String>,
        /// Expected SHA-256 of the plaintext
        #[arg(long)]
        checksum: Option<String>,
    },
    /// Delete a stored artifact
    Delete {
        /// Storage path returned by `ingest`
        storage_path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = init_telemetry() {
        eprintln!("Failed to initialize tracing: {}", e);
    }

    let cli = Cli::parse();
    let config = IngestConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Ingest {
            file,
            encrypt,
            skip_scan,
            name,
            description,
        } => {
            let orchestrator = UploadOrchestrator::from_config(config).await?;
            let incoming = spool_copy(&file, &std::env::temp_dir()).await?;
            let options = UploadOptions {
                encrypt,
                require_security_scan: !skip_scan,
                model_name: name,
                description,
                ..UploadOptions::default()
            };

            match orchestrator.ingest(incoming, options).await {
                Ok(outcome) => print_json(&outcome)?,
                Err(failure) => {
                    print_json(&serde_json::json!({
                        "session_id": failure.session_id,
                        "error": failure.details(),
                    }))?;
                    std::process::exit(1);
                }
            }
        }
        Commands::Validate { file } => {
            let validator = ValidationCoordinator::new(SizePolicy::from(&config));
            let (result, _) = validator
                .validate_file(&file, &original_name(&file)?)
                .await?;
            print_json(&result)?;
        }
        Commands::Scan { file } => {
            let scanner = SecurityScanner::new(ScanPolicy::from(&config))?;
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let result = scanner.scan(data.into(), &original_name(&file)?).await?;
            print_json(&result)?;
        }
        Commands::Retrieve {
            storage_path,
            output,
            key,
            checksum,
        } => {
            let orchestrator = UploadOrchestrator::from_config(config).await?;
            let data = orchestrator
                .retrieve_file(&storage_path, key.as_deref())
                .await?;
            if let Some(expected) = &checksum {
                modelvault_core::verify_digest(&data, expected)?;
            }
            tokio::fs::write(&output, &data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_json(&serde_json::json!({
                "storage_path": storage_path,
                "output": output,
                "size": data.len(),
                "checksum": modelvault_core::sha256_hex(&data),
            }))?;
        }
        Commands::Delete { storage_path } => {
            let orchestrator = UploadOrchestrator::from_config(config).await?;
            orchestrator.delete_file(&storage_path).await?;
            print_json(&serde_json::json!({
                "success": true,
                "message": format!("Artifact {} deleted", storage_path),
            }))?;
        }
    }

    Ok(())
}

//! gcp-bootstrap
//!
//! Prepares a GCP project for Terraform: state bucket, service account,
//! IAM roles and a service account key file.
//!
//! Prerequisites: the Cloud Resource Manager and IAM APIs are enabled and
//! `gcloud auth application-default login` has been run.
//!
//! # Usage
//! ```bash
//! # Prompt for the project id
//! gcp-bootstrap
//!
//! # Non-interactive, JSON summary on stdout
//! gcp-bootstrap --project-id binge-plus-prod --output json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gcp_bootstrap::config::{DEFAULT_BUCKET_LOCATION, DEFAULT_KEY_FILE};
use gcp_bootstrap::{prompt, GcpConnector, ProjectId, Provisioner, SetupConfig};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status when the run finished but some roles could not be granted
const EXIT_PARTIAL: i32 = 2;

/// Bootstrap GCP resources for Terraform
#[derive(Parser, Debug)]
#[command(name = "gcp-bootstrap", version, about)]
struct Args {
    /// GCP Project ID (prompted for when omitted)
    #[arg(long, env = "GCP_PROJECT_ID")]
    project_id: Option<String>,

    /// Where to write the service account key
    #[arg(long, env = "GCP_SETUP_KEY_FILE", default_value = DEFAULT_KEY_FILE)]
    key_file: PathBuf,

    /// Location for a newly created state bucket
    #[arg(long, env = "GCP_SETUP_BUCKET_LOCATION", default_value = DEFAULT_BUCKET_LOCATION)]
    bucket_location: String,

    /// Summary output format
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let project = match &args.project_id {
        Some(raw) => ProjectId::parse(raw)?,
        None => prompt::prompt_project_id()?,
    };

    let config = SetupConfig::default()
        .key_file(&args.key_file)
        .bucket_location(&args.bucket_location);
    let provisioner = Provisioner::new(config);

    let summary = provisioner
        .run(&GcpConnector::default(), &project)
        .await
        .context("GCP setup failed")?;

    match args.output {
        OutputFormat::Text => println!("{}", summary.display()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        ),
    }

    if !summary.is_complete() {
        warn!(
            failed = summary.failed_roles().len(),
            "⚠️ Setup finished with role assignment failures; re-run after fixing permissions"
        );
        std::process::exit(EXIT_PARTIAL);
    }

    info!("✅ GCP infrastructure setup completed successfully!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_explicit_arguments() {
        let args = Args::try_parse_from([
            "gcp-bootstrap",
            "--project-id",
            "binge-plus-prod",
            "--key-file",
            "/tmp/sa.json",
            "--output",
            "json",
        ])
        .unwrap();

        assert_eq!(args.project_id.as_deref(), Some("binge-plus-prod"));
        assert_eq!(args.key_file, PathBuf::from("/tmp/sa.json"));
        assert!(matches!(args.output, OutputFormat::Json));
    }
}

//! s3verify - behavioural conformance suite for S3-compatible storage.
//!
//! Loads the harness configuration, creates the test bucket and runs every
//! feature file against the configured endpoint.
//!
//! # Usage
//!
//! ```text
//! S3VERIFY_CONFIG=./test_config.yaml s3verify
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `S3VERIFY_CONFIG` | `./test_config.yaml` | Configuration file |
//! | `S3VERIFY_FEATURES` | `./features` | Feature file or directory |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//!
//! Every configuration key can also be overridden from the environment, see
//! [`HarnessConfig::with_env_overrides`].

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use s3verify::{HarnessContext, run_features};
use s3verify_core::config::HarnessConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "./test_config.yaml";
const DEFAULT_FEATURES_PATH: &str = "./features";

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `log_level` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = env_or("S3VERIFY_CONFIG", DEFAULT_CONFIG_PATH);
    let features = env_or("S3VERIFY_FEATURES", DEFAULT_FEATURES_PATH);

    let config = HarnessConfig::load(&config_path)
        .with_context(|| format!("failed to load {config_path}"))?
        .with_env_overrides();
    init_tracing(&config.log_level)?;

    info!(
        bucket = %config.bucket_name,
        region = %config.region,
        endpoint = %config.endpoint_url(),
        concurrency = config.concurrency,
        version = env!("CARGO_PKG_VERSION"),
        "starting s3verify",
    );

    let context = HarnessContext::connect(config).context("invalid configuration")?;
    context
        .provision_bucket()
        .await
        .context("failed to provision test bucket")?;

    if run_features(Arc::new(context), &features).await {
        bail!("one or more scenarios failed");
    }
    Ok(())
}

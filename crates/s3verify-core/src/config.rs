//! Harness configuration.
//!
//! Provides [`HarnessConfig`], read once before any scenario runs. Values come
//! from a YAML file and may then be overridden by environment variables.
//!
//! ```yaml
//! bucket_name: s3verify
//! region: us-east-1
//! endpoint: localhost:9000
//! disable_ssl: true
//! access_key_id: minio
//! secret_access_key: minio123
//! concurrency: 4
//! wait:
//!   interval_ms: 500
//!   max_attempts: 20
//!   backoff: fixed
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{HarnessError, HarnessResult};
use crate::fanout::Concurrency;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Configuration for one harness run.
///
/// # Examples
///
/// ```
/// use s3verify_core::config::HarnessConfig;
///
/// let config = HarnessConfig::builder()
///     .bucket_name("conformance".into())
///     .endpoint("localhost:9000".into())
///     .disable_ssl(true)
///     .build();
/// assert_eq!(config.endpoint_url(), "http://localhost:9000");
/// assert_eq!(config.concurrency, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct HarnessConfig {
    /// The single bucket every scenario works in.
    #[builder(default)]
    pub bucket_name: String,

    /// Signing region.
    #[builder(default = String::from(DEFAULT_REGION))]
    pub region: String,

    /// Service endpoint, with or without a scheme.
    #[builder(default)]
    pub endpoint: String,

    /// Talk plain HTTP to the endpoint.
    #[builder(default = false)]
    pub disable_ssl: bool,

    /// Static access key.
    #[builder(default)]
    pub access_key_id: String,

    /// Static secret key.
    #[builder(default)]
    pub secret_access_key: String,

    /// Fan-out width for every object operation.
    #[builder(default = 1)]
    pub concurrency: usize,

    /// Address buckets as `endpoint/bucket` rather than `bucket.endpoint`.
    #[builder(default = true)]
    pub force_path_style: bool,

    /// Number assigned to the first part of a multipart upload.
    ///
    /// Zero by default, which some backends reject; set to 1 for strict
    /// S3 compatibility.
    #[builder(default = 0)]
    pub first_part_number: i32,

    /// Log level filter string, e.g. `"info"`.
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Polling policy for consistency waits.
    #[builder(default)]
    pub wait: WaitConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Delay growth between consistency probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every probe.
    #[default]
    Fixed,
    /// Delay doubles after every probe, up to `max_interval_ms`.
    Exponential,
}

/// Bounded polling policy.
///
/// Defaults match the AWS SDK object and bucket waiters: 20 probes, 5 seconds
/// apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct WaitConfig {
    /// Delay after the first unsuccessful probe.
    #[builder(default = 5_000)]
    pub interval_ms: u64,
    /// Probes issued before giving up.
    #[builder(default = 20)]
    pub max_attempts: u32,
    /// Delay growth policy.
    #[builder(default)]
    pub backoff: Backoff,
    /// Upper bound on a single delay under exponential backoff.
    #[builder(default = 30_000)]
    pub max_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl WaitConfig {
    /// Base probe interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Cap on a single delay.
    #[must_use]
    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms.max(self.interval_ms))
    }
}

impl HarnessConfig {
    /// Parse configuration from YAML text. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> HarnessResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| HarnessError::Config(format!("invalid YAML: {e}")))
    }

    /// Read and parse a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply environment variable overrides.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `S3VERIFY_BUCKET_NAME` | `bucket_name` |
    /// | `S3VERIFY_REGION` | `region` |
    /// | `S3VERIFY_ENDPOINT` | `endpoint` |
    /// | `S3VERIFY_DISABLE_SSL` | `disable_ssl` |
    /// | `AWS_ACCESS_KEY_ID` | `access_key_id` |
    /// | `AWS_SECRET_ACCESS_KEY` | `secret_access_key` |
    /// | `S3VERIFY_CONCURRENCY` | `concurrency` |
    /// | `S3VERIFY_FIRST_PART_NUMBER` | `first_part_number` |
    /// | `LOG_LEVEL` | `log_level` |
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("S3VERIFY_BUCKET_NAME") {
            self.bucket_name = v;
        }
        if let Ok(v) = std::env::var("S3VERIFY_REGION") {
            self.region = v;
        }
        if let Ok(v) = std::env::var("S3VERIFY_ENDPOINT") {
            self.endpoint = v;
        }
        if let Ok(v) = std::env::var("S3VERIFY_DISABLE_SSL") {
            self.disable_ssl = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("AWS_ACCESS_KEY_ID") {
            self.access_key_id = v;
        }
        if let Ok(v) = std::env::var("AWS_SECRET_ACCESS_KEY") {
            self.secret_access_key = v;
        }
        if let Ok(v) = std::env::var("S3VERIFY_CONCURRENCY") {
            if let Ok(n) = v.parse::<usize>() {
                self.concurrency = n;
            }
        }
        if let Ok(v) = std::env::var("S3VERIFY_FIRST_PART_NUMBER") {
            if let Ok(n) = v.parse::<i32>() {
                self.first_part_number = n;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            self.log_level = v;
        }
        self
    }

    /// Reject configurations the harness cannot run with.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.bucket_name.trim().is_empty() {
            return Err(HarnessError::Config("bucket_name must be set".to_owned()));
        }
        if self.wait.max_attempts == 0 {
            return Err(HarnessError::Config(
                "wait.max_attempts must be at least 1".to_owned(),
            ));
        }
        if self.wait.interval_ms == 0 {
            return Err(HarnessError::Config(
                "wait.interval_ms must be positive".to_owned(),
            ));
        }
        self.fan_out_width().map(|_| ())
    }

    /// The configured Concurrency Level.
    pub fn fan_out_width(&self) -> HarnessResult<Concurrency> {
        Concurrency::new(self.concurrency)
            .ok_or_else(|| HarnessError::Config("concurrency must be at least 1".to_owned()))
    }

    /// Endpoint URL with a scheme that honours `disable_ssl`.
    ///
    /// Returns an empty string when no endpoint is configured, letting the
    /// client fall back to the regional AWS endpoint.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return String::new();
        }
        let scheme = if self.disable_ssl { "http" } else { "https" };
        match endpoint.split_once("://") {
            Some(("https", rest)) if self.disable_ssl => format!("http://{rest}"),
            Some(_) => endpoint.to_owned(),
            None => format!("{scheme}://{endpoint}"),
        }
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

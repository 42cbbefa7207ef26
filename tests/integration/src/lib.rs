//! Integration tests for the s3verify engine against a live S3 endpoint.
//!
//! These tests require an S3-compatible server at `localhost:4566` (override
//! with `S3_ENDPOINT_URL`). They are marked `#[ignore]` so they don't run
//! during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p s3verify-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use s3verify_core::config::{HarnessConfig, WaitConfig};
use s3verify_core::store::{ObjectStore, S3ObjectStore};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("S3_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Harness configuration for a fresh bucket on the local server.
#[must_use]
pub fn live_config(prefix: &str, concurrency: usize) -> HarnessConfig {
    init_tracing();
    HarnessConfig::builder()
        .bucket_name(test_bucket_name(prefix))
        .endpoint(endpoint_url())
        .access_key_id("test".into())
        .secret_access_key("test".into())
        .concurrency(concurrency)
        .first_part_number(1)
        .wait(WaitConfig::builder().interval_ms(200).max_attempts(25).build())
        .build()
}

/// Storage capability for `config`.
#[must_use]
pub fn live_store(config: &HarnessConfig) -> Arc<dyn ObjectStore> {
    Arc::new(S3ObjectStore::new(config))
}

/// Delete every object in `bucket`, then the bucket itself.
pub async fn cleanup_bucket(config: &HarnessConfig) {
    let store = S3ObjectStore::new(config);
    let client = store.client();
    let bucket = config.bucket_name.as_str();

    if let Ok(list) = client.list_objects_v2().bucket(bucket).send().await {
        for obj in list.contents() {
            if let Some(key) = obj.key() {
                let _ = client.delete_object().bucket(bucket).key(key).send().await;
            }
        }
    }
    let _ = client.delete_bucket().bucket(bucket).send().await;
}

mod test_multipart;
mod test_object;

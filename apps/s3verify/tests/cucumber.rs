//! Cucumber runner executing the shipped features against the in-memory
//! store.
//!
//! ```text
//! features/*.feature        -> shipped conformance scenarios
//! tests/features/*.feature  -> fan-out and state-machine scenarios
//! ```
//!
//! The store delays delete visibility by one probe so every delete step goes
//! through the consistency waiter.

use std::sync::Arc;

use s3verify::{HarnessContext, run_features};
use s3verify_core::config::{HarnessConfig, WaitConfig};
use s3verify_core::store::{InMemoryObjectStore, ObjectStore};

#[tokio::main]
async fn main() {
    let config = HarnessConfig::builder()
        .bucket_name("s3verify-cucumber".into())
        .concurrency(3)
        .wait(WaitConfig::builder().interval_ms(10).max_attempts(5).build())
        .build();
    let store: Arc<dyn ObjectStore> = Arc::new(
        InMemoryObjectStore::new()
            .with_delete_visibility_lag(1)
            .with_bucket_visibility_lag(1),
    );
    let context = HarnessContext::new(config, store).expect("valid harness config");
    context.provision_bucket().await.expect("bucket provisioned");
    let context = Arc::new(context);

    for features in [
        concat!(env!("CARGO_MANIFEST_DIR"), "/features"),
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/features"),
    ] {
        assert!(
            !run_features(Arc::clone(&context), features).await,
            "scenarios under {features} failed"
        );
    }
}

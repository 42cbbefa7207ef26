//! Run-wide state shared by every scenario.

use std::path::Path;
use std::sync::Arc;

use cucumber::World as _;
use cucumber::cli;
use cucumber::writer::Stats as _;
use futures::FutureExt;
use s3verify_core::config::HarnessConfig;
use s3verify_core::error::HarnessResult;
use s3verify_core::fanout::Concurrency;
use s3verify_core::multipart::MultipartTracker;
use s3verify_core::store::{ObjectStore, S3ObjectStore};
use s3verify_core::waiter::ConsistencyWaiter;
use s3verify_core::worker::ObjectWorkers;
use tracing::info;

use crate::world::S3World;

/// Configuration, storage client and workers, built once per run.
#[derive(Debug)]
pub struct HarnessContext {
    config: HarnessConfig,
    store: Arc<dyn ObjectStore>,
    waiter: ConsistencyWaiter,
    workers: ObjectWorkers,
}

impl HarnessContext {
    /// Build a context over an arbitrary store.
    pub fn new(config: HarnessConfig, store: Arc<dyn ObjectStore>) -> HarnessResult<Self> {
        config.validate()?;
        let width: Concurrency = config.fan_out_width()?;
        let waiter = ConsistencyWaiter::new(&config.wait);
        let workers = ObjectWorkers::new(
            Arc::clone(&store),
            config.bucket_name.as_str(),
            width,
            waiter,
        );
        Ok(Self {
            config,
            store,
            waiter,
            workers,
        })
    }

    /// Build a context talking to the configured S3 endpoint.
    pub fn connect(config: HarnessConfig) -> HarnessResult<Self> {
        let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(&config));
        Self::new(config, store)
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Fanned-out object workers.
    #[must_use]
    pub fn workers(&self) -> &ObjectWorkers {
        &self.workers
    }

    /// A fresh multipart tracker for one scenario.
    #[must_use]
    pub fn tracker(&self) -> MultipartTracker {
        MultipartTracker::new(Arc::clone(&self.store), self.config.bucket_name.as_str())
    }

    /// Create the bucket and wait until it is observable.
    pub async fn provision_bucket(&self) -> HarnessResult<()> {
        let bucket = self.config.bucket_name.as_str();
        self.store.create_bucket(bucket).await?;
        let attempts = self
            .waiter
            .until_bucket_exists(self.store.as_ref(), bucket)
            .await?;
        info!(bucket, attempts, "bucket is ready");
        Ok(())
    }
}

/// Run every feature under `features` sequentially, each scenario in a fresh
/// [`S3World`] attached to `context`.
///
/// Returns whether any step failed. A step that matches no definition counts
/// as a failure. Process arguments are not parsed.
pub async fn run_features(context: Arc<HarnessContext>, features: impl AsRef<Path>) -> bool {
    let summary = S3World::cucumber()
        .max_concurrent_scenarios(1)
        .fail_on_skipped()
        .with_cli::<cli::Empty>(cli::Opts::default())
        .before(move |_, _, _, world| {
            world.attach(Arc::clone(&context));
            futures::future::ready(()).boxed_local()
        })
        .run(features.as_ref())
        .await;
    summary.execution_has_failed()
}

#[cfg(test)]
mod tests {
    use s3verify_core::error::HarnessError;
    use s3verify_core::store::InMemoryObjectStore;

    use super::*;

    fn config() -> HarnessConfig {
        HarnessConfig::builder()
            .bucket_name("conformance".into())
            .concurrency(2)
            .build()
    }

    #[test]
    fn test_should_reject_invalid_config() {
        let err = HarnessContext::new(
            HarnessConfig::default(),
            Arc::new(InMemoryObjectStore::new()),
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[tokio::test]
    async fn test_should_fail_run_with_unmatched_step() {
        let dir = tempfile::tempdir().expect("tempdir");
        let feature = dir.path().join("typo.feature");
        std::fs::write(
            &feature,
            "Feature: Typo\n\n  Scenario: misspelled put\n    When put objcet with key \"X\"\n    Then get object content length is 1024\n",
        )
        .expect("feature written");

        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
        let context = HarnessContext::new(config(), store).expect("context");
        context.provision_bucket().await.expect("bucket");

        assert!(run_features(Arc::new(context), &feature).await);
    }

    #[tokio::test]
    async fn test_should_provision_bucket() {
        let store = Arc::new(InMemoryObjectStore::new());
        let context =
            HarnessContext::new(config(), Arc::clone(&store) as Arc<dyn ObjectStore>)
                .expect("context");
        context.provision_bucket().await.expect("bucket");
        assert!(store.head_bucket("conformance").await.expect("head"));
        assert_eq!(context.workers().width().get(), 2);
    }
}

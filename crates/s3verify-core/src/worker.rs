//! Fanned-out object operations.
//!
//! [`ObjectWorkers`] runs one put, get or delete per worker against the key
//! derived from `(logical key, worker index)`, using [`fan_out`] to dispatch
//! and join them.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};
use crate::fanout::{Concurrency, FanOutReport, fan_out};
use crate::key::ObjectKey;
use crate::payload::Payload;
use crate::store::{FetchedObject, ObjectStore, PutReceipt};
use crate::waiter::ConsistencyWaiter;

/// Executes object operations at a fixed fan-out width in one bucket.
#[derive(Debug, Clone)]
pub struct ObjectWorkers {
    store: Arc<dyn ObjectStore>,
    bucket: Arc<str>,
    width: Concurrency,
    waiter: ConsistencyWaiter,
}

impl ObjectWorkers {
    /// Create workers for `bucket`.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<Arc<str>>,
        width: Concurrency,
        waiter: ConsistencyWaiter,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            width,
            waiter,
        }
    }

    /// Fan-out width.
    #[must_use]
    pub fn width(&self) -> Concurrency {
        self.width
    }

    /// Target bucket.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The storage capability the workers call.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Every worker uploads `payload_size` zero bytes to its own key.
    pub async fn put(&self, key: &ObjectKey, payload_size: usize) -> FanOutReport<PutReceipt> {
        info!(key = %key, width = %self.width, payload_size, "putting object");
        let store = Arc::clone(&self.store);
        let bucket = Arc::clone(&self.bucket);
        let key = key.clone();
        fan_out(self.width, move |index| {
            let store = Arc::clone(&store);
            let bucket = Arc::clone(&bucket);
            let key = key.for_worker(index);
            async move {
                let payload = Payload::zeroed(payload_size).await?;
                let receipt = store
                    .put_object(&bucket, &key, payload.body(), payload.content_md5())
                    .await?;
                debug!(key = %key, etag = ?receipt.etag, "worker put object");
                Ok(receipt)
            }
        })
        .await
    }

    /// Every worker reads back its own key in full.
    pub async fn get(&self, key: &ObjectKey) -> FanOutReport<FetchedObject> {
        info!(key = %key, width = %self.width, "getting object");
        let store = Arc::clone(&self.store);
        let bucket = Arc::clone(&self.bucket);
        let key = key.clone();
        fan_out(self.width, move |index| {
            let store = Arc::clone(&store);
            let bucket = Arc::clone(&bucket);
            let key = key.for_worker(index);
            async move { fetch(store.as_ref(), &bucket, &key).await }
        })
        .await
    }

    /// Every worker deletes its own key and waits until it is observably gone.
    pub async fn delete(&self, key: &ObjectKey) -> FanOutReport<()> {
        info!(key = %key, width = %self.width, "deleting object");
        let store = Arc::clone(&self.store);
        let bucket = Arc::clone(&self.bucket);
        let waiter = self.waiter;
        let key = key.clone();
        fan_out(self.width, move |index| {
            let store = Arc::clone(&store);
            let bucket = Arc::clone(&bucket);
            let key = key.for_worker(index);
            async move { remove(store.as_ref(), waiter, &bucket, &key).await }
        })
        .await
    }

    /// Read `key` exactly as given, without a worker suffix.
    pub async fn get_exact(&self, key: &str) -> HarnessResult<FetchedObject> {
        fetch(self.store.as_ref(), &self.bucket, key).await
    }

    /// Delete `key` exactly as given and wait for its absence.
    pub async fn delete_exact(&self, key: &str) -> HarnessResult<()> {
        remove(self.store.as_ref(), self.waiter, &self.bucket, key).await
    }
}

async fn fetch(store: &dyn ObjectStore, bucket: &str, key: &str) -> HarnessResult<FetchedObject> {
    let object = store.get_object(bucket, key).await?;
    if let Some(reported) = object.content_length {
        if reported != object.received_len() {
            return Err(HarnessError::assertion(
                format!("{key} body length"),
                reported,
                object.received_len(),
            ));
        }
    }
    debug!(key, size = object.received_len(), "worker got object");
    Ok(object)
}

async fn remove(
    store: &dyn ObjectStore,
    waiter: ConsistencyWaiter,
    bucket: &str,
    key: &str,
) -> HarnessResult<()> {
    store.delete_object(bucket, key).await?;
    let attempts = waiter.until_object_absent(store, bucket, key).await?;
    debug!(key, attempts, "worker deleted object");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::WaitConfig;
    use crate::payload::OBJECT_PAYLOAD_SIZE;
    use crate::store::InMemoryObjectStore;

    const BUCKET: &str = "conformance";

    async fn workers(
        store: InMemoryObjectStore,
        width: usize,
    ) -> (Arc<InMemoryObjectStore>, ObjectWorkers) {
        store.create_bucket(BUCKET).await.expect("bucket");
        let store = Arc::new(store);
        let waiter = ConsistencyWaiter::new(
            &WaitConfig::builder().interval_ms(100).max_attempts(4).build(),
        );
        let workers = ObjectWorkers::new(
            Arc::clone(&store) as Arc<dyn ObjectStore>,
            BUCKET,
            Concurrency::new(width).expect("width"),
            waiter,
        );
        (store, workers)
    }

    #[tokio::test]
    async fn test_should_round_trip_one_object_per_worker() {
        let (store, workers) = workers(InMemoryObjectStore::new(), 3).await;
        let key = ObjectKey::new("X");

        let receipts = workers
            .put(&key, OBJECT_PAYLOAD_SIZE)
            .await
            .into_result()
            .expect("put");
        assert_eq!(receipts.len(), 3);
        assert_eq!(store.object_count(), 3);
        assert!(store.object(BUCKET, "X-2").is_some());

        let fetched = workers.get(&key).await.into_result().expect("get");
        let keys: Vec<_> = fetched.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["X-0", "X-1", "X-2"]);
        let total: u64 = fetched.iter().map(FetchedObject::received_len).sum();
        assert_eq!(total, 3 * OBJECT_PAYLOAD_SIZE as u64);
    }

    #[tokio::test]
    async fn test_should_report_failing_worker_without_cancelling_siblings() {
        let (store, workers) = workers(InMemoryObjectStore::new(), 3).await;
        store.fail_key("Y-1");

        let report = workers.put(&ObjectKey::new("Y"), OBJECT_PAYLOAD_SIZE).await;
        assert_eq!(report.width(), 3);
        assert_eq!(report.success_count(), 2);
        let (index, err) = report.first_error().expect("a failure");
        assert_eq!(index, 1);
        assert_eq!(err.status(), Some(500));
        assert_eq!(store.object_count(), 2);
    }

    #[tokio::test]
    async fn test_should_fail_get_of_missing_object() {
        let (_, workers) = workers(InMemoryObjectStore::new(), 2).await;
        let err = workers
            .get(&ObjectKey::new("missing"))
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_delete_and_await_absence() {
        let (store, workers) =
            workers(InMemoryObjectStore::new().with_delete_visibility_lag(2), 2).await;
        let key = ObjectKey::new("Z");
        for index in 0..2 {
            let payload = Payload::from_bytes(vec![0u8; 8]);
            store
                .put_object(BUCKET, &key.for_worker(index), payload.body(), payload.content_md5())
                .await
                .expect("seed");
        }

        let start = tokio::time::Instant::now();
        workers.delete(&key).await.into_result().expect("delete");
        assert_eq!(store.object_count(), 0);
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_time_out_when_delete_never_becomes_visible() {
        let (store, workers) =
            workers(InMemoryObjectStore::new().with_delete_visibility_lag(50), 1).await;
        let payload = Payload::from_bytes(vec![1u8; 8]);
        store
            .put_object(BUCKET, "slow", payload.body(), payload.content_md5())
            .await
            .expect("seed");

        let err = workers.delete_exact("slow").await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::ConsistencyTimeout { attempts: 4, .. }
        ));
    }
}

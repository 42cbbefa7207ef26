//! Fanned-out object lifecycle against a live endpoint.

#[cfg(test)]
mod tests {
    use s3verify::HarnessContext;
    use s3verify_core::key::ObjectKey;
    use s3verify_core::payload::OBJECT_PAYLOAD_SIZE;
    use s3verify_core::store::FetchedObject;

    use crate::{cleanup_bucket, live_config, live_store};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_round_trip_objects_from_every_worker() {
        let config = live_config("object", 4);
        let context =
            HarnessContext::new(config.clone(), live_store(&config)).expect("context");
        context.provision_bucket().await.expect("bucket");
        let key = ObjectKey::new("object_test");

        let receipts = context
            .workers()
            .put(&key, OBJECT_PAYLOAD_SIZE)
            .await
            .into_result()
            .expect("put");
        assert_eq!(receipts.len(), 4);
        assert!(receipts.iter().all(|r| r.etag.is_some()));

        let fetched = context.workers().get(&key).await.into_result().expect("get");
        let total: u64 = fetched.iter().map(FetchedObject::received_len).sum();
        assert_eq!(total, 4 * OBJECT_PAYLOAD_SIZE as u64);

        context
            .workers()
            .delete(&key)
            .await
            .into_result()
            .expect("delete");
        assert!(context.workers().get(&key).await.into_result().is_err());

        cleanup_bucket(&config).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_tolerate_existing_bucket() {
        let config = live_config("rebucket", 1);
        let context =
            HarnessContext::new(config.clone(), live_store(&config)).expect("context");
        context.provision_bucket().await.expect("first create");
        context.provision_bucket().await.expect("second create");
        cleanup_bucket(&config).await;
    }
}

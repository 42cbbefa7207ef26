//! Multipart session lifecycle against a live endpoint.

#[cfg(test)]
mod tests {
    use s3verify::HarnessContext;
    use s3verify_core::error::HarnessError;
    use s3verify_core::payload::{MIB, Payload};

    use crate::{cleanup_bucket, live_config, live_store};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_complete_three_part_upload() {
        let config = live_config("mpu", 1);
        let context =
            HarnessContext::new(config.clone(), live_store(&config)).expect("context");
        context.provision_bucket().await.expect("bucket");
        let mut tracker = context.tracker();

        tracker.initiate("multipart.bin").await.expect("initiate");
        for (offset, size) in [(0, 5 * MIB), (1, 4 * MIB), (2, 3 * MIB)] {
            let payload = Payload::zeroed(size).await.expect("payload");
            tracker
                .upload_part("multipart.bin", config.first_part_number + offset, &payload)
                .await
                .expect("upload part");
        }
        assert_eq!(tracker.list_parts("multipart.bin").await.expect("list").len(), 3);
        tracker.complete("multipart.bin").await.expect("complete");

        let object = context
            .workers()
            .get_exact("multipart.bin")
            .await
            .expect("get assembled object");
        assert_eq!(object.received_len(), 12 * MIB as u64);

        context
            .workers()
            .delete_exact("multipart.bin")
            .await
            .expect("delete");
        cleanup_bucket(&config).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_close_session_after_abort() {
        let config = live_config("mpu-abort", 1);
        let context =
            HarnessContext::new(config.clone(), live_store(&config)).expect("context");
        context.provision_bucket().await.expect("bucket");
        let mut tracker = context.tracker();

        tracker.initiate("aborted.bin").await.expect("initiate");
        tracker.abort("aborted.bin").await.expect("abort");
        assert!(matches!(
            tracker.list_parts("aborted.bin").await,
            Err(HarnessError::SessionClosed { .. })
        ));
        cleanup_bucket(&config).await;
    }
}

//! In-memory [`ObjectStore`] test double.
//!
//! Behaves like a small, strict S3: it validates `Content-MD5`, enforces part
//! ordering on completion and answers with S3 error codes and statuses. Two
//! knobs make it useful for exercising the engine:
//!
//! - visibility lag: a deleted object (or a freshly created bucket) keeps its
//!   old `Head*` answer for a configurable number of probes, modelling an
//!   eventually consistent read path;
//! - failure injection: any operation on a key registered with
//!   [`InMemoryObjectStore::fail_key`] answers `500 InternalError`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::{DashMap, DashSet};
use tracing::debug;

use super::{FetchedObject, ObjectStore, PartRecord, PutReceipt};
use crate::checksum;
use crate::error::{HarnessError, HarnessResult};

type ObjectId = (String, String);

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    etag: String,
}

#[derive(Debug)]
struct PendingUpload {
    bucket: String,
    key: String,
    parts: BTreeMap<i32, StoredObject>,
}

/// Thread-safe in-memory object store.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    /// Bucket name to the number of `HeadBucket` probes still answering "not found".
    buckets: DashMap<String, u32>,
    objects: DashMap<ObjectId, StoredObject>,
    /// Deleted objects that `HeadObject` still reports, with remaining probe count.
    lingering: DashMap<ObjectId, u32>,
    uploads: DashMap<String, PendingUpload>,
    failing_keys: DashSet<String>,
    delete_visibility_lag: u32,
    bucket_visibility_lag: u32,
}

impl InMemoryObjectStore {
    /// Create an empty, immediately consistent store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep reporting a deleted object as present for `probes` `HeadObject` calls.
    #[must_use]
    pub fn with_delete_visibility_lag(mut self, probes: u32) -> Self {
        self.delete_visibility_lag = probes;
        self
    }

    /// Report a new bucket as missing for `probes` `HeadBucket` calls.
    #[must_use]
    pub fn with_bucket_visibility_lag(mut self, probes: u32) -> Self {
        self.bucket_visibility_lag = probes;
        self
    }

    /// Make every operation on `key` fail with `500 InternalError`.
    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing_keys.insert(key.into());
    }

    /// Body of a stored object.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .get(&(bucket.to_owned(), key.to_owned()))
            .map(|o| o.body.clone())
    }

    /// Number of stored objects across all buckets.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of multipart uploads neither completed nor aborted.
    #[must_use]
    pub fn pending_upload_count(&self) -> usize {
        self.uploads.len()
    }

    fn check_fault(&self, operation: &'static str, key: &str) -> HarnessResult<()> {
        if self.failing_keys.contains(key) {
            return Err(service_error(
                operation,
                500,
                "InternalError",
                format!("injected failure for {key}"),
            ));
        }
        Ok(())
    }

    fn check_bucket(&self, operation: &'static str, bucket: &str) -> HarnessResult<()> {
        if self.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(service_error(operation, 404, "NoSuchBucket", bucket))
        }
    }
}

fn service_error(
    operation: &'static str,
    status: u16,
    code: &str,
    message: impl std::fmt::Display,
) -> HarnessError {
    HarnessError::Transport {
        operation,
        status: Some(status),
        message: format!("{code}: {message}"),
    }
}

fn object_id(bucket: &str, key: &str) -> ObjectId {
    (bucket.to_owned(), key.to_owned())
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn create_bucket(&self, bucket: &str) -> HarnessResult<()> {
        self.buckets
            .entry(bucket.to_owned())
            .or_insert(self.bucket_visibility_lag);
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> HarnessResult<bool> {
        match self.buckets.get_mut(bucket) {
            Some(mut hidden) if *hidden > 0 => {
                *hidden -= 1;
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_md5: &str,
    ) -> HarnessResult<PutReceipt> {
        self.check_fault("PutObject", key)?;
        self.check_bucket("PutObject", bucket)?;

        let expected = checksum::content_md5_to_hex(content_md5).ok_or_else(|| {
            service_error("PutObject", 400, "InvalidDigest", content_md5)
        })?;
        let actual = checksum::md5_hex(&body);
        if expected != actual {
            return Err(service_error(
                "PutObject",
                400,
                "BadDigest",
                format!("Content-MD5 {expected} does not match body {actual}"),
            ));
        }

        let etag = format!("\"{actual}\"");
        let id = object_id(bucket, key);
        self.lingering.remove(&id);
        self.objects.insert(
            id,
            StoredObject {
                body,
                etag: etag.clone(),
            },
        );
        Ok(PutReceipt {
            key: key.to_owned(),
            etag: Some(etag),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> HarnessResult<FetchedObject> {
        self.check_fault("GetObject", key)?;
        self.check_bucket("GetObject", bucket)?;

        let object = self
            .objects
            .get(&object_id(bucket, key))
            .map(|o| o.body.clone())
            .ok_or_else(|| service_error("GetObject", 404, "NoSuchKey", key))?;

        Ok(FetchedObject {
            key: key.to_owned(),
            content_length: Some(object.len() as u64),
            body: object,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> HarnessResult<()> {
        self.check_fault("DeleteObject", key)?;
        self.check_bucket("DeleteObject", bucket)?;

        let id = object_id(bucket, key);
        if self.objects.remove(&id).is_some() && self.delete_visibility_lag > 0 {
            self.lingering.insert(id, self.delete_visibility_lag);
        }
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> HarnessResult<bool> {
        self.check_fault("HeadObject", key)?;
        let id = object_id(bucket, key);
        if self.objects.contains_key(&id) {
            return Ok(true);
        }
        let still_visible = match self.lingering.get_mut(&id) {
            Some(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        if !still_visible {
            self.lingering.remove(&id);
        }
        Ok(still_visible)
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> HarnessResult<String> {
        self.check_fault("CreateMultipartUpload", key)?;
        self.check_bucket("CreateMultipartUpload", bucket)?;

        let upload_id = uuid::Uuid::new_v4().simple().to_string();
        self.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                parts: BTreeMap::new(),
            },
        );
        debug!(bucket, key, upload_id = %upload_id, "created in-memory multipart upload");
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> HarnessResult<Option<String>> {
        self.check_fault("UploadPart", key)?;
        if part_number < 0 {
            return Err(service_error(
                "UploadPart",
                400,
                "InvalidArgument",
                format!("part number {part_number} is negative"),
            ));
        }

        let mut upload = self
            .uploads
            .get_mut(upload_id)
            .filter(|u| u.bucket == bucket && u.key == key)
            .ok_or_else(|| service_error("UploadPart", 404, "NoSuchUpload", upload_id))?;

        let etag = checksum::etag(&body);
        upload.parts.insert(
            part_number,
            StoredObject {
                body,
                etag: etag.clone(),
            },
        );
        Ok(Some(etag))
    }

    async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> HarnessResult<Vec<PartRecord>> {
        let upload = self
            .uploads
            .get(upload_id)
            .filter(|u| u.bucket == bucket && u.key == key)
            .ok_or_else(|| service_error("ListParts", 404, "NoSuchUpload", upload_id))?;

        Ok(upload
            .parts
            .iter()
            .map(|(&part_number, part)| PartRecord {
                part_number,
                etag: Some(part.etag.clone()),
                size: Some(part.body.len() as u64),
            })
            .collect())
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartRecord],
    ) -> HarnessResult<()> {
        const OP: &str = "CompleteMultipartUpload";

        let upload = self
            .uploads
            .get(upload_id)
            .filter(|u| u.bucket == bucket && u.key == key)
            .ok_or_else(|| service_error(OP, 404, "NoSuchUpload", upload_id))?;

        if parts.is_empty() {
            return Err(service_error(
                OP,
                400,
                "MalformedXML",
                "the request must list at least one part",
            ));
        }
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(service_error(
                OP,
                400,
                "InvalidPartOrder",
                "parts must be listed in ascending order",
            ));
        }

        let mut body = BytesMut::new();
        let mut etags = Vec::with_capacity(parts.len());
        for requested in parts {
            let stored = upload
                .parts
                .get(&requested.part_number)
                .filter(|p| requested.etag.as_deref() == Some(p.etag.as_str()))
                .ok_or_else(|| {
                    service_error(
                        OP,
                        400,
                        "InvalidPart",
                        format!("part {} not found or ETag mismatch", requested.part_number),
                    )
                })?;
            body.extend_from_slice(&stored.body);
            etags.push(stored.etag.clone());
        }
        drop(upload);

        self.uploads.remove(upload_id);
        let id = object_id(bucket, key);
        self.lingering.remove(&id);
        self.objects.insert(
            id,
            StoredObject {
                body: body.freeze(),
                etag: checksum::multipart_etag(&etags),
            },
        );
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> HarnessResult<()> {
        self.uploads
            .remove_if(upload_id, |_, u| u.bucket == bucket && u.key == key)
            .map(|_| ())
            .ok_or_else(|| service_error("AbortMultipartUpload", 404, "NoSuchUpload", upload_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: &str = "bucket";

    async fn store() -> InMemoryObjectStore {
        let store = InMemoryObjectStore::new();
        store.create_bucket(BUCKET).await.expect("create bucket");
        store
    }

    #[tokio::test]
    async fn test_should_put_and_get_object() {
        let store = store().await;
        let body = Bytes::from_static(b"hello");
        let receipt = store
            .put_object(BUCKET, "k", body.clone(), &checksum::content_md5(&body))
            .await
            .expect("put");
        assert_eq!(receipt.etag.as_deref(), Some(checksum::etag(&body).as_str()));

        let fetched = store.get_object(BUCKET, "k").await.expect("get");
        assert_eq!(fetched.body, body);
        assert_eq!(fetched.content_length, Some(5));
    }

    #[tokio::test]
    async fn test_should_reject_bad_digest() {
        let store = store().await;
        let err = store
            .put_object(
                BUCKET,
                "k",
                Bytes::from_static(b"hello"),
                &checksum::content_md5(b"other"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("BadDigest"));
    }

    #[tokio::test]
    async fn test_should_reject_missing_bucket() {
        let store = InMemoryObjectStore::new();
        let err = store.get_object("nope", "k").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_should_linger_after_delete() {
        let store = InMemoryObjectStore::new().with_delete_visibility_lag(2);
        store.create_bucket(BUCKET).await.expect("bucket");
        let body = Bytes::from_static(b"x");
        store
            .put_object(BUCKET, "k", body.clone(), &checksum::content_md5(&body))
            .await
            .expect("put");

        store.delete_object(BUCKET, "k").await.expect("delete");
        assert!(store.head_object(BUCKET, "k").await.expect("head"));
        assert!(store.head_object(BUCKET, "k").await.expect("head"));
        assert!(!store.head_object(BUCKET, "k").await.expect("head"));
        assert!(store.get_object(BUCKET, "k").await.is_err());
    }

    #[tokio::test]
    async fn test_should_hide_new_bucket_for_configured_probes() {
        let store = InMemoryObjectStore::new().with_bucket_visibility_lag(1);
        store.create_bucket(BUCKET).await.expect("bucket");
        assert!(!store.head_bucket(BUCKET).await.expect("head"));
        assert!(store.head_bucket(BUCKET).await.expect("head"));
    }

    #[tokio::test]
    async fn test_should_inject_failures_per_key() {
        let store = store().await;
        store.fail_key("bad");
        let err = store.get_object(BUCKET, "bad").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_should_assemble_multipart_upload_in_part_order() {
        let store = store().await;
        let upload_id = store
            .create_multipart_upload(BUCKET, "mp")
            .await
            .expect("create");

        let mut records = Vec::new();
        for (number, fill) in [(1, b'b'), (0, b'a')] {
            let etag = store
                .upload_part(BUCKET, "mp", &upload_id, number, Bytes::from(vec![fill; 4]))
                .await
                .expect("upload");
            records.push(PartRecord {
                part_number: number,
                etag,
                size: None,
            });
        }

        let listed = store.list_parts(BUCKET, "mp", &upload_id).await.expect("list");
        assert_eq!(
            listed.iter().map(|p| p.part_number).collect::<Vec<_>>(),
            vec![0, 1]
        );

        let err = store
            .complete_multipart_upload(BUCKET, "mp", &upload_id, &records)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("InvalidPartOrder"));

        records.sort_by_key(|p| p.part_number);
        store
            .complete_multipart_upload(BUCKET, "mp", &upload_id, &records)
            .await
            .expect("complete");
        assert_eq!(store.object(BUCKET, "mp").as_deref(), Some(&b"aaaabbbb"[..]));
        assert_eq!(store.pending_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_should_forget_aborted_upload() {
        let store = store().await;
        let upload_id = store
            .create_multipart_upload(BUCKET, "mp")
            .await
            .expect("create");
        store
            .abort_multipart_upload(BUCKET, "mp", &upload_id)
            .await
            .expect("abort");

        let err = store.list_parts(BUCKET, "mp", &upload_id).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(
            store
                .abort_multipart_upload(BUCKET, "mp", &upload_id)
                .await
                .is_err()
        );
    }
}

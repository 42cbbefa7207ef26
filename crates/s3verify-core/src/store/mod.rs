//! The storage capability under test.
//!
//! [`ObjectStore`] is the narrow set of S3 operations the engine issues. Every
//! call returns a [`HarnessResult`]; implementations must not retry, because a
//! transient failure is exactly what the harness exists to surface.
//!
//! Two implementations ship with the crate:
//!
//! - [`S3ObjectStore`] talks to a real endpoint through `aws-sdk-s3`.
//! - [`InMemoryObjectStore`] is a test double with injectable faults and
//!   delayed visibility of deletes.

mod memory;
mod s3;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::HarnessResult;

pub use memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;

/// A (part number, integrity tag) pair of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    /// Caller-assigned part number.
    pub part_number: i32,
    /// ETag returned when the part was uploaded.
    pub etag: Option<String>,
    /// Part size in bytes, when the service reported it.
    pub size: Option<u64>,
}

/// What a successful `PutObject` returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutReceipt {
    /// Key the object was stored under.
    pub key: String,
    /// ETag of the stored object.
    pub etag: Option<String>,
}

/// A fully read `GetObject` response.
#[derive(Debug, Clone)]
pub struct FetchedObject {
    /// Key the object was read from.
    pub key: String,
    /// `Content-Length` reported by the service.
    pub content_length: Option<u64>,
    /// The body as received.
    pub body: Bytes,
}

impl FetchedObject {
    /// Number of body bytes actually received.
    #[must_use]
    pub fn received_len(&self) -> u64 {
        self.body.len() as u64
    }
}

/// The S3 operations the verification engine depends on.
///
/// Uses `#[async_trait]` so the store can be shared as `Arc<dyn ObjectStore>`
/// across worker tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// `CreateBucket`. A bucket the caller already owns counts as created.
    async fn create_bucket(&self, bucket: &str) -> HarnessResult<()>;

    /// `HeadBucket`: `Ok(false)` when the bucket is not found.
    async fn head_bucket(&self, bucket: &str) -> HarnessResult<bool>;

    /// `PutObject` with a `Content-MD5` integrity header.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_md5: &str,
    ) -> HarnessResult<PutReceipt>;

    /// `GetObject`, reading the whole body.
    async fn get_object(&self, bucket: &str, key: &str) -> HarnessResult<FetchedObject>;

    /// `DeleteObject`.
    async fn delete_object(&self, bucket: &str, key: &str) -> HarnessResult<()>;

    /// `HeadObject`: `Ok(false)` when the object is not found.
    async fn head_object(&self, bucket: &str, key: &str) -> HarnessResult<bool>;

    /// `CreateMultipartUpload`, returning the upload id.
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> HarnessResult<String>;

    /// `UploadPart`, returning the part's ETag when the service sent one.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> HarnessResult<Option<String>>;

    /// `ListParts`, following pagination to the end.
    async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> HarnessResult<Vec<PartRecord>>;

    /// `CompleteMultipartUpload` with `parts` in the order given.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartRecord],
    ) -> HarnessResult<()>;

    /// `AbortMultipartUpload`.
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> HarnessResult<()>;
}

//! Per-scenario state for the conformance steps.
//!
//! Every scenario gets a fresh [`S3World`]. Operation steps store what the
//! engine returned; verification steps inspect it afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use cucumber::World;
use s3verify_core::error::{HarnessError, HarnessResult, check_equal};
use s3verify_core::key::ObjectKey;
use s3verify_core::multipart::MultipartTracker;
use s3verify_core::payload::{MIB, OBJECT_PAYLOAD_SIZE, Payload};
use s3verify_core::store::{FetchedObject, PartRecord, PutReceipt};

use crate::context::HarnessContext;

/// HTTP status S3 answers a successful call with.
const STATUS_OK: u16 = 200;
/// HTTP status S3 answers a successful delete or abort with.
const STATUS_NO_CONTENT: u16 = 204;

/// A step-level storage operation whose status can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Fanned-out `PutObject`.
    PutObject,
    /// Fanned-out `GetObject`.
    GetObject,
    /// Fanned-out `DeleteObject`.
    DeleteObject,
    /// `CreateMultipartUpload`.
    InitiateMultipartUpload,
    /// `UploadPart` of one ordinal part.
    UploadPart(PartOrdinal),
    /// `ListParts`.
    ListParts,
    /// `CompleteMultipartUpload`.
    CompleteMultipartUpload,
    /// `AbortMultipartUpload`.
    AbortMultipartUpload,
    /// `GetObject` of the assembled multipart object.
    GetMultipartObject,
    /// `DeleteObject` of the assembled multipart object.
    DeleteMultipartObject,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PutObject => f.write_str("put object"),
            Self::GetObject => f.write_str("get object"),
            Self::DeleteObject => f.write_str("delete object"),
            Self::InitiateMultipartUpload => f.write_str("initiate multipart upload"),
            Self::UploadPart(ordinal) => write!(f, "upload the {ordinal} part"),
            Self::ListParts => f.write_str("list multipart"),
            Self::CompleteMultipartUpload => f.write_str("complete multipart upload"),
            Self::AbortMultipartUpload => f.write_str("abort multipart upload"),
            Self::GetMultipartObject => f.write_str("get the multipart object"),
            Self::DeleteMultipartObject => f.write_str("delete the multipart object"),
        }
    }
}

/// Position of a part in the three-part upload scenario.
///
/// The first part is 5 MiB (the S3 minimum for a non-final part), the second
/// 4 MiB and the third 3 MiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOrdinal {
    /// Part at `first_part_number`.
    First,
    /// Part at `first_part_number + 1`.
    Second,
    /// Part at `first_part_number + 2`.
    Third,
}

impl PartOrdinal {
    /// Part number relative to the configured first part number.
    #[must_use]
    pub fn offset(self) -> i32 {
        match self {
            Self::First => 0,
            Self::Second => 1,
            Self::Third => 2,
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn payload_size(self) -> usize {
        match self {
            Self::First => 5 * MIB,
            Self::Second => 4 * MIB,
            Self::Third => 3 * MIB,
        }
    }
}

impl FromStr for PartOrdinal {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "second" => Ok(Self::Second),
            "third" => Ok(Self::Third),
            other => Err(HarnessError::assertion(
                "part ordinal",
                "first, second or third",
                other,
            )),
        }
    }
}

impl fmt::Display for PartOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Third => "third",
        })
    }
}

/// A multipart operation attempted in a negative-path step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartAction {
    /// Upload one ordinal part.
    Upload(PartOrdinal),
    /// List parts.
    List,
    /// Complete the upload.
    Complete,
    /// Abort the upload.
    Abort,
}

/// How a rejected multipart operation is expected to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The session was already completed or aborted.
    Closed,
    /// The operation is not valid in the session's current state.
    InvalidState,
}

impl FromStr for Rejection {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "closed" => Ok(Self::Closed),
            "invalid" => Ok(Self::InvalidState),
            other => Err(HarnessError::assertion("rejection", "closed or invalid", other)),
        }
    }
}

/// Cucumber world for object and multipart scenarios.
#[derive(Debug, Default, World)]
pub struct S3World {
    context: Option<Arc<HarnessContext>>,
    tracker: Option<MultipartTracker>,
    put_receipts: Vec<PutReceipt>,
    fetched: Vec<FetchedObject>,
    multipart_object: Option<FetchedObject>,
    statuses: HashMap<Operation, u16>,
    last_attempt: Option<HarnessResult<()>>,
}

impl S3World {
    /// Bind the world to the run-wide context.
    pub fn attach(&mut self, context: Arc<HarnessContext>) {
        self.tracker = Some(context.tracker());
        self.context = Some(context);
    }

    fn context(&self) -> HarnessResult<Arc<HarnessContext>> {
        self.context
            .clone()
            .ok_or_else(|| HarnessError::Config("scenario world has no harness context".to_owned()))
    }

    fn tracker(&mut self) -> HarnessResult<&mut MultipartTracker> {
        self.tracker
            .as_mut()
            .ok_or_else(|| HarnessError::Config("scenario world has no harness context".to_owned()))
    }

    fn succeeded(&mut self, operation: Operation, status: u16) {
        self.statuses.insert(operation, status);
    }

    /// Put a 1 KiB object from every worker.
    pub async fn put_object(&mut self, key: &str) -> HarnessResult<()> {
        let context = self.context()?;
        self.put_receipts = context
            .workers()
            .put(&ObjectKey::new(key), OBJECT_PAYLOAD_SIZE)
            .await
            .into_result()?;
        self.succeeded(Operation::PutObject, STATUS_OK);
        Ok(())
    }

    /// Read back every worker's object.
    pub async fn get_object(&mut self, key: &str) -> HarnessResult<()> {
        let context = self.context()?;
        self.fetched = context
            .workers()
            .get(&ObjectKey::new(key))
            .await
            .into_result()?;
        self.succeeded(Operation::GetObject, STATUS_OK);
        Ok(())
    }

    /// Delete every worker's object and await its absence.
    pub async fn delete_object(&mut self, key: &str) -> HarnessResult<()> {
        let context = self.context()?;
        context
            .workers()
            .delete(&ObjectKey::new(key))
            .await
            .into_result()?;
        self.succeeded(Operation::DeleteObject, STATUS_NO_CONTENT);
        Ok(())
    }

    /// Number of receipts from the last put.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.put_receipts.len()
    }

    /// Check the sum of body lengths across every worker's get.
    pub fn check_total_content_length(&self, expected: u64) -> HarnessResult<()> {
        let total: u64 = self.fetched.iter().map(FetchedObject::received_len).sum();
        check_equal("total content length", expected, total)
    }

    /// Check the body length each worker received.
    pub fn check_each_content_length(&self, expected: u64) -> HarnessResult<()> {
        if self.fetched.is_empty() {
            return Err(HarnessError::assertion("fetched objects", "at least one", 0));
        }
        self.fetched.iter().try_for_each(|object| {
            check_equal(
                &format!("{} content length", object.key),
                expected,
                object.received_len(),
            )
        })
    }

    /// Check the recorded status of the last `operation` call.
    pub fn check_status(&self, operation: Operation, expected: u16) -> HarnessResult<()> {
        let observed = self.statuses.get(&operation).copied().ok_or_else(|| {
            HarnessError::assertion(format!("{operation} status code"), expected, "no call")
        })?;
        check_equal(&format!("{operation} status code"), expected, observed)
    }

    /// Initiate the scenario's multipart upload.
    pub async fn initiate_multipart_upload(&mut self, key: &str) -> HarnessResult<()> {
        self.tracker()?.initiate(key).await?;
        self.succeeded(Operation::InitiateMultipartUpload, STATUS_OK);
        Ok(())
    }

    async fn upload_ordinal(&mut self, ordinal: PartOrdinal, key: &str) -> HarnessResult<()> {
        let part_number = self.context()?.config().first_part_number + ordinal.offset();
        let payload = Payload::zeroed(ordinal.payload_size()).await?;
        self.tracker()?
            .upload_part(key, part_number, &payload)
            .await?;
        Ok(())
    }

    /// Upload one part of the three-part scenario.
    pub async fn upload_part(&mut self, ordinal: PartOrdinal, key: &str) -> HarnessResult<()> {
        self.upload_ordinal(ordinal, key).await?;
        self.succeeded(Operation::UploadPart(ordinal), STATUS_OK);
        Ok(())
    }

    /// List the parts of the scenario's upload.
    pub async fn list_parts(&mut self, key: &str) -> HarnessResult<()> {
        self.tracker()?.list_parts(key).await?;
        self.succeeded(Operation::ListParts, STATUS_OK);
        Ok(())
    }

    /// Check the number of parts the last listing returned.
    pub fn check_listed_part_count(&self, expected: usize) -> HarnessResult<()> {
        let observed = self
            .tracker
            .as_ref()
            .and_then(MultipartTracker::listed_parts)
            .map(<[PartRecord]>::len)
            .ok_or_else(|| HarnessError::assertion("multipart parts", "listed", "never listed"))?;
        check_equal("listed part count", expected, observed)
    }

    /// Complete the scenario's upload.
    pub async fn complete_multipart_upload(&mut self, key: &str) -> HarnessResult<()> {
        self.tracker()?.complete(key).await?;
        self.succeeded(Operation::CompleteMultipartUpload, STATUS_OK);
        Ok(())
    }

    /// Abort the scenario's upload.
    pub async fn abort_multipart_upload(&mut self, key: &str) -> HarnessResult<()> {
        self.tracker()?.abort(key).await?;
        self.succeeded(Operation::AbortMultipartUpload, STATUS_NO_CONTENT);
        Ok(())
    }

    /// Read the assembled multipart object.
    pub async fn get_multipart_object(&mut self, key: &str) -> HarnessResult<()> {
        let context = self.context()?;
        self.multipart_object = Some(context.workers().get_exact(key).await?);
        self.succeeded(Operation::GetMultipartObject, STATUS_OK);
        Ok(())
    }

    /// Check the length of the assembled multipart object.
    pub fn check_multipart_object_length(&self, expected: u64) -> HarnessResult<()> {
        let observed = self
            .multipart_object
            .as_ref()
            .map(FetchedObject::received_len)
            .ok_or_else(|| {
                HarnessError::assertion("multipart object", "fetched", "never fetched")
            })?;
        check_equal("multipart object content length", expected, observed)
    }

    /// Delete the assembled multipart object and await its absence.
    pub async fn delete_multipart_object(&mut self, key: &str) -> HarnessResult<()> {
        let context = self.context()?;
        context.workers().delete_exact(key).await?;
        self.succeeded(Operation::DeleteMultipartObject, STATUS_NO_CONTENT);
        Ok(())
    }

    /// Run a multipart operation expected to be refused, keeping its outcome.
    pub async fn attempt(&mut self, action: MultipartAction, key: &str) -> HarnessResult<()> {
        let outcome = match action {
            MultipartAction::Upload(ordinal) => self.upload_ordinal(ordinal, key).await,
            MultipartAction::List => self.tracker()?.list_parts(key).await.map(|_| ()),
            MultipartAction::Complete => self.tracker()?.complete(key).await,
            MultipartAction::Abort => self.tracker()?.abort(key).await,
        };
        self.last_attempt = Some(outcome);
        Ok(())
    }

    /// Check that the last attempted operation was refused as `expected`.
    pub fn check_rejection(&self, expected: Rejection) -> HarnessResult<()> {
        match (&self.last_attempt, expected) {
            (Some(Err(HarnessError::SessionClosed { .. })), Rejection::Closed)
            | (Some(Err(HarnessError::SessionState { .. })), Rejection::InvalidState) => Ok(()),
            (Some(Ok(())), _) => Err(HarnessError::assertion(
                "attempted multipart operation",
                "rejection",
                "success",
            )),
            (Some(Err(other)), _) => Err(HarnessError::assertion(
                "attempted multipart operation",
                format!("{expected:?} rejection"),
                other,
            )),
            (None, _) => Err(HarnessError::assertion(
                "attempted multipart operation",
                "an attempt",
                "none",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use s3verify_core::config::{HarnessConfig, WaitConfig};
    use s3verify_core::store::{InMemoryObjectStore, ObjectStore};

    use super::*;

    async fn world(concurrency: usize) -> S3World {
        let config = HarnessConfig::builder()
            .bucket_name("conformance".into())
            .concurrency(concurrency)
            .wait(WaitConfig::builder().interval_ms(10).max_attempts(3).build())
            .build();
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
        let context = HarnessContext::new(config, store).expect("context");
        context.provision_bucket().await.expect("bucket");
        let mut world = S3World::default();
        world.attach(Arc::new(context));
        world
    }

    #[test]
    fn test_should_parse_part_ordinals() {
        assert_eq!("second".parse::<PartOrdinal>().expect("ordinal"), PartOrdinal::Second);
        assert!(matches!(
            "fourth".parse::<PartOrdinal>(),
            Err(HarnessError::Assertion { .. })
        ));
        assert_eq!("closed".parse::<Rejection>().expect("rejection"), Rejection::Closed);
        assert!(matches!(
            "refused".parse::<Rejection>(),
            Err(HarnessError::Assertion { .. })
        ));
        assert_eq!(PartOrdinal::Third.offset(), 2);
        assert_eq!(PartOrdinal::First.payload_size(), 5 * MIB);
    }

    #[tokio::test]
    async fn test_should_aggregate_content_length_across_workers() {
        let mut world = world(3).await;
        world.put_object("X").await.expect("put");
        assert_eq!(world.put_count(), 3);
        world.get_object("X").await.expect("get");
        world.check_total_content_length(3072).expect("total");
        world.check_each_content_length(1024).expect("each");
        assert!(world.check_total_content_length(1024).is_err());
        world.check_status(Operation::GetObject, 200).expect("status");
        assert!(world.check_status(Operation::DeleteObject, 204).is_err());
    }

    #[tokio::test]
    async fn test_should_require_listing_before_part_count() {
        let mut world = world(1).await;
        world.initiate_multipart_upload("K").await.expect("initiate");
        world.upload_part(PartOrdinal::First, "K").await.expect("upload");
        assert!(matches!(
            world.check_listed_part_count(0),
            Err(HarnessError::Assertion { .. })
        ));

        world.list_parts("K").await.expect("list");
        world.check_listed_part_count(1).expect("one part listed");
        world.abort_multipart_upload("K").await.expect("abort");
    }

    #[tokio::test]
    async fn test_should_record_rejection_after_abort() {
        let mut world = world(1).await;
        world.initiate_multipart_upload("K").await.expect("initiate");
        world.abort_multipart_upload("K").await.expect("abort");
        world.check_status(Operation::AbortMultipartUpload, 204).expect("status");

        world.attempt(MultipartAction::List, "K").await.expect("attempt");
        world.check_rejection(Rejection::Closed).expect("closed");
        assert!(world.check_rejection(Rejection::InvalidState).is_err());
    }

    #[tokio::test]
    async fn test_should_fail_without_context() {
        let mut world = S3World::default();
        assert!(matches!(
            world.put_object("X").await,
            Err(HarnessError::Config(_))
        ));
    }
}

use std::sync::Arc;

use tracing::info;

use super::{MultipartSession, SessionState};
use crate::error::{HarnessError, HarnessResult};
use crate::payload::Payload;
use crate::store::{ObjectStore, PartRecord};

/// Drives one scenario's multipart upload against the store.
///
/// Holds at most one session. A new session can be initiated once the
/// previous one is completed or aborted.
#[derive(Debug)]
pub struct MultipartTracker {
    store: Arc<dyn ObjectStore>,
    bucket: Arc<str>,
    session: Option<MultipartSession>,
}

impl MultipartTracker {
    /// Create a tracker with no session.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            session: None,
        }
    }

    /// State of the current session, `Uninitiated` when there is none.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Uninitiated, MultipartSession::state)
    }

    /// The current session.
    #[must_use]
    pub fn session(&self) -> Option<&MultipartSession> {
        self.session.as_ref()
    }

    /// Records returned by the most recent `list_parts`, `None` when the
    /// current session was never listed.
    #[must_use]
    pub fn listed_parts(&self) -> Option<&[PartRecord]> {
        self.session.as_ref().and_then(MultipartSession::listed)
    }

    fn current(&self, operation: &'static str) -> HarnessResult<&MultipartSession> {
        self.session
            .as_ref()
            .ok_or_else(|| HarnessError::SessionState {
                operation,
                state: SessionState::Uninitiated,
                reason: "no multipart upload was initiated".to_owned(),
            })
    }

    fn current_mut(&mut self, operation: &'static str) -> HarnessResult<&mut MultipartSession> {
        self.session
            .as_mut()
            .ok_or_else(|| HarnessError::SessionState {
                operation,
                state: SessionState::Uninitiated,
                reason: "no multipart upload was initiated".to_owned(),
            })
    }

    /// Start a multipart upload for `key`, returning its upload id.
    pub async fn initiate(&mut self, key: &str) -> HarnessResult<&str> {
        const OP: &str = "CreateMultipartUpload";
        if let Some(open) = self.session.as_ref().filter(|s| s.state().is_open()) {
            return Err(HarnessError::SessionState {
                operation: OP,
                state: open.state(),
                reason: format!("upload {} for {} is still open", open.upload_id(), open.key()),
            });
        }

        let upload_id = self.store.create_multipart_upload(&self.bucket, key).await?;
        info!(key, upload_id = %upload_id, "initiated multipart upload");
        let session = self
            .session
            .insert(MultipartSession::new(&*self.bucket, key, upload_id));
        Ok(session.upload_id())
    }

    /// Upload `payload` as part `part_number` of `key`.
    pub async fn upload_part(
        &mut self,
        key: &str,
        part_number: i32,
        payload: &Payload,
    ) -> HarnessResult<PartRecord> {
        const OP: &str = "UploadPart";
        let session = self.current(OP)?;
        session.check_upload(OP, key, part_number)?;

        let etag = self
            .store
            .upload_part(
                &self.bucket,
                key,
                session.upload_id(),
                part_number,
                payload.body(),
            )
            .await?;
        let record = PartRecord {
            part_number,
            etag,
            size: Some(payload.len() as u64),
        };
        info!(key, part_number, size = payload.len(), etag = ?record.etag, "uploaded part");

        self.current_mut(OP)?.record_part(record.clone());
        Ok(record)
    }

    /// List the parts the service holds for the upload of `key`.
    pub async fn list_parts(&mut self, key: &str) -> HarnessResult<&[PartRecord]> {
        const OP: &str = "ListParts";
        let session = self.current(OP)?;
        session.check_list(OP, key)?;

        let listed = self
            .store
            .list_parts(&self.bucket, key, session.upload_id())
            .await?;
        info!(key, count = listed.len(), "listed parts");

        let session = self.current_mut(OP)?;
        session.record_listing(listed);
        Ok(session.listed().unwrap_or_default())
    }

    /// Complete the upload of `key` from every uploaded part.
    pub async fn complete(&mut self, key: &str) -> HarnessResult<()> {
        const OP: &str = "CompleteMultipartUpload";
        let session = self.current(OP)?;
        let parts = session.completion_parts(OP, key)?;

        self.store
            .complete_multipart_upload(&self.bucket, key, session.upload_id(), &parts)
            .await?;
        info!(key, parts = parts.len(), "completed multipart upload");

        self.current_mut(OP)?.mark_completed();
        Ok(())
    }

    /// Abort the upload of `key`.
    pub async fn abort(&mut self, key: &str) -> HarnessResult<()> {
        const OP: &str = "AbortMultipartUpload";
        let session = self.current(OP)?;
        session.check_abort(OP, key)?;

        self.store
            .abort_multipart_upload(&self.bucket, key, session.upload_id())
            .await?;
        info!(key, "aborted multipart upload");

        self.current_mut(OP)?.mark_aborted();
        Ok(())
    }
}

use std::collections::BTreeMap;

use super::SessionState;
use crate::error::{HarnessError, HarnessResult};
use crate::store::PartRecord;

/// One multipart upload and the parts recorded against it.
///
/// Methods named `check_*` validate a transition without changing anything;
/// `record_*`/`mark_*` apply it once the storage call has succeeded.
#[derive(Debug, Clone)]
pub struct MultipartSession {
    bucket: String,
    key: String,
    upload_id: String,
    state: SessionState,
    parts: BTreeMap<i32, PartRecord>,
    listed: Option<Vec<PartRecord>>,
}

impl MultipartSession {
    /// A freshly initiated session.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: upload_id.into(),
            state: SessionState::Initiated,
            parts: BTreeMap::new(),
            listed: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Bucket of the upload.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key the upload was initiated for.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Service-issued upload id.
    #[must_use]
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Uploaded parts in ascending part-number order.
    pub fn parts(&self) -> impl Iterator<Item = &PartRecord> {
        self.parts.values()
    }

    /// Number of uploaded parts.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Records returned by the most recent listing, `None` until the parts
    /// have been listed once.
    #[must_use]
    pub fn listed(&self) -> Option<&[PartRecord]> {
        self.listed.as_deref()
    }

    fn reject(&self, operation: &'static str, reason: impl Into<String>) -> HarnessError {
        HarnessError::SessionState {
            operation,
            state: self.state,
            reason: reason.into(),
        }
    }

    fn check_open(&self, operation: &'static str, key: &str) -> HarnessResult<()> {
        if self.state.is_closed() {
            return Err(HarnessError::SessionClosed {
                operation,
                state: self.state,
            });
        }
        if key != self.key {
            return Err(self.reject(
                operation,
                format!("key {key} does not match initiated key {}", self.key),
            ));
        }
        Ok(())
    }

    /// Validate uploading `part_number` for `key`.
    pub fn check_upload(
        &self,
        operation: &'static str,
        key: &str,
        part_number: i32,
    ) -> HarnessResult<()> {
        self.check_open(operation, key)?;
        if !matches!(
            self.state,
            SessionState::Initiated | SessionState::PartsUploading
        ) {
            return Err(self.reject(operation, "parts can no longer be added"));
        }
        if self.parts.contains_key(&part_number) {
            return Err(self.reject(
                operation,
                format!("part {part_number} was already uploaded"),
            ));
        }
        Ok(())
    }

    /// Record an uploaded part.
    pub fn record_part(&mut self, record: PartRecord) {
        self.parts.insert(record.part_number, record);
        self.state = SessionState::PartsUploading;
    }

    /// Validate listing parts of `key`.
    pub fn check_list(&self, operation: &'static str, key: &str) -> HarnessResult<()> {
        self.check_open(operation, key)
    }

    /// Keep a listing and move to [`SessionState::Listed`].
    pub fn record_listing(&mut self, listed: Vec<PartRecord>) {
        self.listed = Some(listed);
        self.state = SessionState::Listed;
    }

    /// Validate completion and return the parts to submit, ascending by
    /// part number.
    pub fn completion_parts(
        &self,
        operation: &'static str,
        key: &str,
    ) -> HarnessResult<Vec<PartRecord>> {
        self.check_open(operation, key)?;
        if self.parts.is_empty() {
            return Err(self.reject(operation, "no part was uploaded"));
        }
        if let Some(untagged) = self.parts.values().find(|p| p.etag.is_none()) {
            return Err(self.reject(
                operation,
                format!("part {} has no ETag", untagged.part_number),
            ));
        }
        Ok(self.parts.values().cloned().collect())
    }

    /// Validate aborting the upload of `key`.
    pub fn check_abort(&self, operation: &'static str, key: &str) -> HarnessResult<()> {
        self.check_open(operation, key)
    }

    /// Move to [`SessionState::Completed`].
    pub fn mark_completed(&mut self) {
        self.state = SessionState::Completed;
    }

    /// Move to [`SessionState::Aborted`].
    pub fn mark_aborted(&mut self) {
        self.state = SessionState::Aborted;
    }
}

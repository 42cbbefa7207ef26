//! Deterministic upload payloads.
//!
//! Payloads are materialised through a temporary file that exists only while
//! the payload is being generated: the file is created, filled with zero bytes,
//! read back and removed before [`Payload::zeroed`] returns.

use std::io::{Read, Seek, SeekFrom, Write};

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::checksum;
use crate::error::{HarnessError, HarnessResult};

/// One kibibyte.
pub const KIB: usize = 1024;
/// One mebibyte.
pub const MIB: usize = 1024 * KIB;

/// Size of the body written by every fanned-out put.
pub const OBJECT_PAYLOAD_SIZE: usize = KIB;

const WRITE_CHUNK: usize = 64 * KIB;

/// An in-memory upload body and its integrity header.
#[derive(Debug, Clone)]
pub struct Payload {
    body: Bytes,
    content_md5: String,
}

impl Payload {
    /// Generate `size` zero bytes through a scoped temporary file.
    pub async fn zeroed(size: usize) -> HarnessResult<Self> {
        tokio::task::spawn_blocking(move || Self::zeroed_blocking(size))
            .await
            .map_err(|e| HarnessError::Io(std::io::Error::other(e)))?
    }

    fn zeroed_blocking(size: usize) -> HarnessResult<Self> {
        let mut file = NamedTempFile::with_prefix("s3verify-payload-")?;
        let chunk = vec![0u8; WRITE_CHUNK.min(size.max(1))];
        let mut remaining = size;
        while remaining > 0 {
            let n = remaining.min(chunk.len());
            file.write_all(&chunk[..n])?;
            remaining -= n;
        }
        file.flush()?;

        file.seek(SeekFrom::Start(0))?;
        let mut body = Vec::with_capacity(size);
        file.read_to_end(&mut body)?;
        debug!(path = %file.path().display(), size, "generated payload");
        // `file` is dropped here, which removes it from disk.

        Ok(Self::from_bytes(body))
    }

    /// Wrap an existing body.
    #[must_use]
    pub fn from_bytes(body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let content_md5 = checksum::content_md5(&body);
        Self { body, content_md5 }
    }

    /// The body, cheaply cloneable.
    #[must_use]
    pub fn body(&self) -> Bytes {
        self.body.clone()
    }

    /// Base64 MD5 of the body for the `Content-MD5` header.
    #[must_use]
    pub fn content_md5(&self) -> &str {
        &self.content_md5
    }

    /// Body length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

//! Multipart upload session tracking.
//!
//! A scenario drives one multipart upload through
//! `initiate → upload parts → list → complete` (or `abort`). The pure state
//! machine lives in [`MultipartSession`]; [`MultipartTracker`] issues the
//! storage calls and advances the session only after each call succeeds.
//!
//! ```text
//! Uninitiated ─initiate─▶ Initiated ─upload─▶ PartsUploading ─list─▶ Listed
//!                            │                  │   ▲   │              │
//!                            │                  └───┘   └──complete──▶ Completed
//!                            └──────────abort──────────────────────▶ Aborted
//! ```

mod session;
mod tracker;

use std::fmt;

pub use session::MultipartSession;
pub use tracker::MultipartTracker;

/// Lifecycle state of a multipart session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No upload has been initiated.
    Uninitiated,
    /// An upload id was issued; no part uploaded yet.
    Initiated,
    /// At least one part was uploaded.
    PartsUploading,
    /// Parts were listed back from the service.
    Listed,
    /// The upload was completed into an object.
    Completed,
    /// The upload was aborted.
    Aborted,
}

impl SessionState {
    /// Whether the session has been completed or aborted.
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Whether an upload id is live.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Initiated | Self::PartsUploading | Self::Listed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitiated => "uninitiated",
            Self::Initiated => "initiated",
            Self::PartsUploading => "uploading parts",
            Self::Listed => "listed",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        })
    }
}

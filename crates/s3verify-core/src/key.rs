//! Object key derivation for fanned-out steps.

use std::fmt;

/// Longest logical key, in characters, used before the worker suffix is added.
pub const MAX_KEY_LENGTH: usize = 1000;

/// A logical object key as written in a scenario.
///
/// The key is clamped to [`MAX_KEY_LENGTH`] characters on construction.
/// Clamping counts characters rather than bytes, so a multi-byte key is never
/// split inside a code point.
///
/// # Examples
///
/// ```
/// use s3verify_core::key::ObjectKey;
///
/// let key = ObjectKey::new("photos/cat.jpg");
/// assert_eq!(key.for_worker(2), "photos/cat.jpg-2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a key, clamping it to [`MAX_KEY_LENGTH`] characters.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let mut raw = raw.into();
        if let Some((cut, _)) = raw.char_indices().nth(MAX_KEY_LENGTH) {
            raw.truncate(cut);
        }
        Self(raw)
    }

    /// The clamped key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key owned by the worker at `index`.
    ///
    /// The suffix is appended after clamping and is therefore always intact.
    #[must_use]
    pub fn for_worker(&self, index: usize) -> String {
        format!("{}-{index}", self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ObjectKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

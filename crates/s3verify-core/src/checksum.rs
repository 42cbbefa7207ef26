//! Checksum helpers for request integrity headers and ETags.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use digest::Digest;

/// Compute the `Content-MD5` header value for `data`.
///
/// S3 expects the base64 encoding of the raw 16-byte digest (RFC 1864), not
/// the hex form used in ETags.
///
/// # Examples
///
/// ```
/// use s3verify_core::checksum::content_md5;
///
/// assert_eq!(content_md5(b""), "1B2M2Y8AsgTpgAmY7PhCfg==");
/// ```
#[must_use]
pub fn content_md5(data: &[u8]) -> String {
    BASE64_STANDARD.encode(md5::Md5::digest(data))
}

/// Compute the hex-encoded MD5 digest of `data`.
#[must_use]
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(md5::Md5::digest(data))
}

/// Compute the quoted hex MD5 of `data`, as S3 reports it in an ETag.
#[must_use]
pub fn etag(data: &[u8]) -> String {
    format!("\"{}\"", md5_hex(data))
}

/// Compute the composite ETag S3 reports for a completed multipart upload.
///
/// The value is the MD5 of the concatenated binary part digests, suffixed with
/// the part count: `"<hex>-<count>"`.
#[must_use]
pub fn multipart_etag<S: AsRef<str>>(part_etags: &[S]) -> String {
    let mut combined = Vec::with_capacity(part_etags.len() * 16);
    for tag in part_etags {
        if let Ok(bytes) = hex::decode(tag.as_ref().trim_matches('"')) {
            combined.extend_from_slice(&bytes);
        }
    }
    format!(
        "\"{}-{}\"",
        hex::encode(md5::Md5::digest(&combined)),
        part_etags.len()
    )
}

/// Decode a `Content-MD5` header value back into a hex digest.
///
/// Returns `None` when the value is not valid base64 or not 16 bytes long.
#[must_use]
pub fn content_md5_to_hex(value: &str) -> Option<String> {
    let raw = BASE64_STANDARD.decode(value).ok()?;
    (raw.len() == 16).then(|| hex::encode(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_encode_content_md5_as_base64() {
        assert_eq!(content_md5(b"hello"), "XUFAKrxLKna5cZ2REBfFkg==");
    }

    #[test]
    fn test_should_quote_etag() {
        assert_eq!(etag(b"hello"), "\"5d41402abc4b2a76b9719d911017c592\"");
    }

    #[test]
    fn test_should_roundtrip_content_md5_to_hex() {
        let zeros = vec![0u8; 1024];
        assert_eq!(
            content_md5_to_hex(&content_md5(&zeros)),
            Some(md5_hex(&zeros))
        );
        assert_eq!(content_md5_to_hex("not base64!"), None);
        assert_eq!(content_md5_to_hex("AAAA"), None);
    }

    #[test]
    fn test_should_suffix_multipart_etag_with_part_count() {
        let tags = [etag(b"a"), etag(b"b"), etag(b"c")];
        let composite = multipart_etag(&tags);
        assert!(composite.starts_with('"'));
        assert!(composite.ends_with("-3\""));
    }
}

use crate::transport::HttpRequest;
use crate::url::canonicalize_url;
use crate::UrlError;
use sha2::{Digest, Sha256};

/// Computes the cache fingerprint of a request
///
/// The digest covers the upper-cased method, the canonical URL and the body.
/// Headers are deliberately left out: two requests that only differ in, say,
/// their cookies must replay the same record.
///
/// # Returns
///
/// * `Ok(String)` - Lowercase hex SHA-256 digest
/// * `Err(UrlError)` - The request URL cannot be canonicalized
pub fn fingerprint(request: &HttpRequest) -> Result<String, UrlError> {
    let canonical = canonicalize_url(request.url.as_str())?;

    let mut hasher = Sha256::new();
    hasher.update(request.method.as_str().to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(&request.body);

    Ok(hex::encode(hasher.finalize()))
}

//! Request signature hashing.

use bulwark_interface::RequestSignature;
use sha2::{Digest, Sha256};

/// Hex SHA-256 digest identifying a request signature.
///
/// Method, URL and body are hashed with length prefixes so distinct
/// signatures cannot collide by concatenation.
pub fn signature_digest(signature: &RequestSignature) -> String {
    let mut hasher = Sha256::new();
    let method = signature.method().as_str().as_bytes();
    let url = signature.url().as_bytes();
    hasher.update((method.len() as u64).to_le_bytes());
    hasher.update(method);
    hasher.update((url.len() as u64).to_le_bytes());
    hasher.update(url);
    match signature.body() {
        Some(body) => {
            hasher.update([1u8]);
            hasher.update((body.len() as u64).to_le_bytes());
            hasher.update(body);
        }
        None => hasher.update([0u8]),
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_core::Method;

    #[test]
    fn test_digest_distinguishes_fields() {
        let base = RequestSignature::new(Method::Get, "https://api/a", None);
        let other_method = RequestSignature::new(Method::Post, "https://api/a", None);
        let empty_body = RequestSignature::new(Method::Get, "https://api/a", Some(Vec::new()));
        let digest = signature_digest(&base);

        assert_eq!(digest.len(), 64);
        assert_eq!(digest, signature_digest(&base.clone()));
        assert_ne!(digest, signature_digest(&other_method));
        assert_ne!(digest, signature_digest(&empty_body));
    }
}

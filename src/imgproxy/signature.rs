//! imgproxy URL signing.
//!
//! imgproxy verifies every processing URL with an HMAC-SHA256 over the salt
//! followed by the path:
//!
//! ```text
//! signature = base64url_nopad(HMAC-SHA256(key, salt + "/rs:fit:640/q:87/plain/..."))
//! url       = "{imgproxy_url}/{signature}/rs:fit:640/q:87/plain/..."
//! ```
//!
//! # Example
//!
//! ```rust
//! use imgproxy_gateway::imgproxy::ImgproxySigner;
//!
//! let signer = ImgproxySigner::new("secret", "hello");
//! let path = "/rs:fit:640/q:87/plain/http://store/abc.jpg@webp";
//!
//! let signature = signer.sign(path).unwrap();
//! assert_eq!(signature.len(), 43);
//! assert_eq!(signer.signed_path(path).unwrap(), format!("/{}{}", signature, path));
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Compute a raw HMAC-SHA256.
///
/// The key is used as-is, with no derivation step; any length is accepted.
pub fn hmac_sha256(
    key: impl AsRef<[u8]>,
    message: impl AsRef<[u8]>,
) -> Result<Vec<u8>, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(key.as_ref())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(message.as_ref());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Signs imgproxy processing paths with a key and salt.
#[derive(Clone)]
pub struct ImgproxySigner {
    key: String,
    salt: String,
}

impl ImgproxySigner {
    /// Create a signer from the decoded (not hex) key and salt.
    pub fn new(key: impl Into<String>, salt: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            salt: salt.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Compute the URL-safe, unpadded base64 signature of `path`.
    ///
    /// Deterministic: no nonce or timestamp is mixed in.
    pub fn sign(&self, path: &str) -> Result<String, SignatureError> {
        let mut message = String::with_capacity(self.salt.len() + path.len());
        message.push_str(&self.salt);
        message.push_str(path);

        let digest = hmac_sha256(&self.key, message)?;
        Ok(URL_SAFE_NO_PAD.encode(digest))
    }

    /// Prefix `path` with its signature, ready to be appended to the imgproxy base URL.
    pub fn signed_path(&self, path: &str) -> Result<String, SignatureError> {
        let signature = self.sign(path)?;
        Ok(format!("/{}{}", signature, path))
    }
}

impl std::fmt::Debug for ImgproxySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImgproxySigner")
            .field("key", &"<redacted>")
            .field("salt", &"<redacted>")
            .finish()
    }
}

use crate::application_port::AuthError;
use crate::domain_model::{FINGERPRINT_LEN, Fingerprint, UserId};
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;

/// Keyed digest of a refresh token: HMAC-SHA256(key, subject ":" token).
/// Binding the subject means two users can never share a stored digest.
#[derive(Clone)]
pub struct RefreshFingerprinter {
    mac: Hmac<Sha256>,
}

impl RefreshFingerprinter {
    pub fn new(key: &[u8]) -> Result<Self, AuthError> {
        let mac = Hmac::<Sha256>::new_from_slice(key)
            .map_err(|e| AuthError::InternalError(format!("fingerprint key: {e}")))?;
        Ok(RefreshFingerprinter { mac })
    }

    fn keyed(&self, subject: UserId, token: &str) -> Hmac<Sha256> {
        let mut mac = self.mac.clone();
        mac.update(subject.0.as_bytes());
        mac.update(b":");
        mac.update(token.as_bytes());
        mac
    }

    pub fn digest(&self, subject: UserId, token: &str) -> Fingerprint {
        let out = self.keyed(subject, token).finalize().into_bytes();
        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes.copy_from_slice(&out);
        Fingerprint::from_array(bytes)
    }

    /// Constant-time comparison of `digest(subject, token)` against `stored`.
    pub fn matches(&self, subject: UserId, token: &str, stored: &Fingerprint) -> bool {
        self.keyed(subject, token)
            .verify_slice(stored.as_bytes())
            .is_ok()
    }
}

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const FINGERPRINT_LEN: usize = 32;

/// Stored form of a refresh token. Only this digest is ever persisted.
#[derive(Clone, Eq, PartialEq)]
pub struct Fingerprint(Vec<u8>);

#[derive(Debug, Clone, thiserror::Error)]
pub enum FingerprintDecodeError {
    #[error("fingerprint must be {FINGERPRINT_LEN} bytes, got {0}")]
    Length(usize),
    #[error("fingerprint is not valid hex: {0}")]
    Hex(String),
}

impl Fingerprint {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FingerprintDecodeError> {
        if bytes.len() != FINGERPRINT_LEN {
            return Err(FingerprintDecodeError::Length(bytes.len()));
        }
        Ok(Fingerprint(bytes))
    }

    pub fn from_array(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Fingerprint(bytes.to_vec())
    }

    pub fn from_hex(s: &str) -> Result<Self, FingerprintDecodeError> {
        let bytes = hex::decode(s).map_err(|e| FingerprintDecodeError::Hex(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

// Digest bytes stay out of logs.
impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}..)", &self.to_hex()[..8])
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            Fingerprint::from_bytes(vec![0u8; 31]),
            Err(FingerprintDecodeError::Length(31))
        ));
        assert!(Fingerprint::from_hex("zz").is_err());
    }

    #[test]
    fn debug_does_not_print_full_digest() {
        let fp = Fingerprint::from_bytes(vec![0xab; FINGERPRINT_LEN]).unwrap();
        let printed = format!("{:?}", fp);
        assert_eq!(printed, "Fingerprint(abababab..)");
    }

    #[test]
    fn serde_uses_hex() {
        let fp = Fingerprint::from_bytes((0..32).collect()).unwrap();
        let json = serde_json::to_string(&fp).unwrap();
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }
}

use crate::application_port::{AuthError, TokenCodec};
use crate::domain_model::{Role, UserId, VerifiedClaims};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    iat: i64,
    exp: i64,
    jti: String,
}

/// HS256 signer/verifier. The key is set once at startup; changing it
/// invalidates every outstanding token.
pub struct JwtHs256Codec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtHs256Codec {
    pub fn new(signing_key: &[u8]) -> Self {
        JwtHs256Codec {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
        }
    }

    fn validation() -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock below.
        v.validate_exp = false;
        v.leeway = 0;
        v.required_spec_claims = HashSet::from(["sub".to_string(), "exp".to_string()]);
        v
    }

    fn decode_claims(&self, token: &str) -> Result<TokenClaims, AuthError> {
        // Reject alg confusion before touching the key: only HS256 is ever issued.
        let header = jsonwebtoken::decode_header(token).map_err(|_| AuthError::TokenMalformed)?;
        if header.alg != Algorithm::HS256 {
            return Err(AuthError::TokenMalformed);
        }

        let data = decode::<TokenClaims>(token, &self.decoding_key, &Self::validation())
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
                _ => AuthError::TokenMalformed,
            })?;
        Ok(data.claims)
    }

    fn verified(claims: TokenClaims) -> Result<VerifiedClaims, AuthError> {
        let subject = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::TokenMalformed)?;
        if claims.jti.is_empty() {
            return Err(AuthError::TokenMalformed);
        }
        Ok(VerifiedClaims {
            subject,
            role: claims.role,
            issued_at: claims.iat,
            expires_at: claims.exp,
            token_id: claims.jti,
        })
    }
}

impl TokenCodec for JwtHs256Codec {
    fn issue(
        &self,
        subject: UserId,
        role: Option<Role>,
        jti: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AuthError::InternalError(format!("token ttl: {e}")))?;
        let exp_dt = now + ttl;
        let claims = TokenClaims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp_dt.timestamp(),
            jti: jti.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok((token, exp_dt))
    }

    fn parse(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedClaims, AuthError> {
        let claims = self.decode_claims(token)?;
        if claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Self::verified(claims)
    }

    fn parse_ignoring_expiry(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let claims = self.decode_claims(token)?;
        Self::verified(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::TimeZone;

    const KEY: &[u8] = b"test-signing-key";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn b64(bytes: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(bytes)
    }

    #[test]
    fn issue_then_parse_round_trips() {
        let codec = JwtHs256Codec::new(KEY);
        let uid = UserId::new_random();
        let now = at(1_700_000_000);

        let (token, exp) = codec
            .issue(uid, Some(Role::Admin), "jti-1", now, Duration::from_secs(60))
            .unwrap();
        assert_eq!(exp, at(1_700_000_060));
        assert_eq!(token.split('.').count(), 3);

        let claims = codec.parse(&token, now).unwrap();
        assert_eq!(claims.subject, uid);
        assert_eq!(claims.role, Some(Role::Admin));
        assert_eq!(claims.token_id, "jti-1");
        assert_eq!(claims.issued_at, 1_700_000_000);
        assert_eq!(claims.expires_at, 1_700_000_060);
    }

    #[test]
    fn refresh_style_token_has_no_role_claim() {
        let codec = JwtHs256Codec::new(KEY);
        let (token, _) = codec
            .issue(UserId::new_random(), None, "j", at(0), Duration::from_secs(60))
            .unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let payload = String::from_utf8(URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert!(!payload.contains("role"), "payload: {payload}");
        assert_eq!(codec.parse(&token, at(0)).unwrap().role, None);
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let codec = JwtHs256Codec::new(KEY);
        let uid = UserId::new_random();
        let issued = at(1_000);
        let (token, _) = codec
            .issue(uid, Some(Role::User), "j", issued, Duration::from_secs(10))
            .unwrap();

        // exp == now + 1
        assert!(codec.parse(&token, at(1_009)).is_ok());
        // exp == now
        assert!(matches!(
            codec.parse(&token, at(1_010)),
            Err(AuthError::TokenExpired)
        ));
        assert!(codec.parse_ignoring_expiry(&token).is_ok());
    }

    #[test]
    fn wrong_key_is_signature_invalid() {
        let codec = JwtHs256Codec::new(KEY);
        let other = JwtHs256Codec::new(b"another-key");
        let (token, _) = other
            .issue(UserId::new_random(), Some(Role::Admin), "j", at(0), Duration::from_secs(60))
            .unwrap();
        assert!(matches!(
            codec.parse(&token, at(1)),
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[test]
    fn tampered_role_is_signature_invalid() {
        let codec = JwtHs256Codec::new(KEY);
        let uid = UserId::new_random();
        let (token, _) = codec
            .issue(uid, Some(Role::User), "j", at(0), Duration::from_secs(60))
            .unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = b64(
            format!(r#"{{"sub":"{uid}","role":"admin","iat":0,"exp":60,"jti":"j"}}"#).as_bytes(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(matches!(
            codec.parse(&forged, at(1)),
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[test]
    fn non_hmac_and_none_algorithms_are_rejected() {
        let codec = JwtHs256Codec::new(KEY);
        let payload = b64(br#"{"sub":"00000000-0000-0000-0000-000000000000","iat":0,"exp":99999999999,"jti":"j"}"#);
        for header in [
            r#"{"alg":"none","typ":"JWT"}"#,
            r#"{"alg":"RS256","typ":"JWT"}"#,
            r#"{"alg":"HS512","typ":"JWT"}"#,
        ] {
            let token = format!("{}.{}.c2ln", b64(header.as_bytes()), payload);
            assert!(
                matches!(codec.parse(&token, at(1)), Err(AuthError::TokenMalformed)),
                "accepted header {header}"
            );
        }
    }

    #[test]
    fn garbage_is_malformed_not_a_panic() {
        let codec = JwtHs256Codec::new(KEY);
        for token in ["", ".", "..", "a.b.c", "not a token", "x.y"] {
            assert!(matches!(
                codec.parse(token, at(0)),
                Err(AuthError::TokenMalformed)
            ));
        }
    }
}

use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What a route requires of the caller.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Access {
    /// Any valid access token.
    Authenticated,
    Role(Role),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum GateRejection {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    ExpiredToken,
    #[error("forbidden")]
    Forbidden,
}

impl GateRejection {
    pub fn status(self) -> u16 {
        match self {
            GateRejection::Forbidden => 403,
            _ => 401,
        }
    }
}

/// Bearer-token check at the request boundary. Touches no store.
#[derive(Clone)]
pub struct AuthorizationGate {
    token_codec: Arc<dyn TokenCodec>,
}

impl AuthorizationGate {
    pub fn new(token_codec: Arc<dyn TokenCodec>) -> Self {
        Self { token_codec }
    }

    pub fn authorize(
        &self,
        header: Option<&str>,
        access: Access,
    ) -> Result<Principal, GateRejection> {
        self.authorize_at(header, access, Utc::now())
    }

    pub fn authorize_at(
        &self,
        header: Option<&str>,
        access: Access,
        now: DateTime<Utc>,
    ) -> Result<Principal, GateRejection> {
        let header = header.ok_or(GateRejection::MissingHeader)?;
        let token = bearer_token(header).ok_or(GateRejection::MalformedHeader)?;

        let claims = self.token_codec.parse(token, now).map_err(|e| match e {
            AuthError::TokenExpired => GateRejection::ExpiredToken,
            other => {
                warn!(error = %other, "bearer token rejected");
                GateRejection::InvalidToken
            }
        })?;

        // Refresh tokens carry no role and are not accepted as bearer tokens.
        let role = claims.role.ok_or(GateRejection::InvalidToken)?;

        if let Access::Role(required) = access {
            if role != required {
                warn!(user_id = %claims.subject, %role, %required, "role requirement not met");
                return Err(GateRejection::Forbidden);
            }
        }

        Ok(Principal {
            user_id: claims.subject,
            role,
            token_id: claims.token_id,
        })
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::JwtHs256Codec;
    use std::time::Duration;

    fn gate() -> (AuthorizationGate, Arc<JwtHs256Codec>) {
        let codec = Arc::new(JwtHs256Codec::new(b"gate-key"));
        (AuthorizationGate::new(codec.clone()), codec)
    }

    fn bearer(codec: &JwtHs256Codec, role: Option<Role>, now: DateTime<Utc>) -> (UserId, String) {
        let uid = UserId::new_random();
        let (token, _) = codec
            .issue(uid, role, "jti-1", now, Duration::from_secs(60))
            .unwrap();
        (uid, format!("Bearer {token}"))
    }

    #[test]
    fn missing_and_malformed_headers_are_401() {
        let (gate, codec) = gate();
        let (_, good) = bearer(&codec, Some(Role::User), Utc::now());
        let token = good.trim_start_matches("Bearer ");

        assert_eq!(
            gate.authorize(None, Access::Authenticated),
            Err(GateRejection::MissingHeader)
        );
        for header in [
            "".to_string(),
            token.to_string(),
            format!("bearer {token}"),
            format!("Basic {token}"),
            format!("Bearer  {token}"),
            format!("Bearer {token} extra"),
            "Bearer ".to_string(),
        ] {
            assert_eq!(
                gate.authorize(Some(header.as_str()), Access::Authenticated),
                Err(GateRejection::MalformedHeader),
                "{header:?}"
            );
        }
        assert_eq!(GateRejection::MalformedHeader.status(), 401);
    }

    #[test]
    fn invalid_token_is_401() {
        let (gate, _) = gate();
        let other = JwtHs256Codec::new(b"other-key");
        let (_, forged) = bearer(&other, Some(Role::Admin), Utc::now());

        for header in ["Bearer garbage", forged.as_str()] {
            let rejection = gate.authorize(Some(header), Access::Authenticated);
            assert_eq!(rejection, Err(GateRejection::InvalidToken));
        }
    }

    #[test]
    fn expired_token_is_401_expired() {
        let (gate, codec) = gate();
        let issued = Utc::now();
        let (_, header) = bearer(&codec, Some(Role::User), issued);

        let later = issued + chrono::Duration::seconds(61);
        let rejection = gate.authorize_at(Some(header.as_str()), Access::Authenticated, later);
        assert_eq!(rejection, Err(GateRejection::ExpiredToken));
        assert_eq!(GateRejection::ExpiredToken.status(), 401);
    }

    #[test]
    fn refresh_token_is_not_a_bearer_token() {
        let (gate, codec) = gate();
        let (_, header) = bearer(&codec, None, Utc::now());
        assert_eq!(
            gate.authorize(Some(header.as_str()), Access::Authenticated),
            Err(GateRejection::InvalidToken)
        );
    }

    #[test]
    fn role_mismatch_is_403() {
        let (gate, codec) = gate();
        let (_, header) = bearer(&codec, Some(Role::User), Utc::now());
        let rejection = gate.authorize(Some(header.as_str()), Access::Role(Role::Admin));
        assert_eq!(rejection, Err(GateRejection::Forbidden));
        assert_eq!(GateRejection::Forbidden.status(), 403);
    }

    #[test]
    fn allowed_requests_yield_principal() {
        let (gate, codec) = gate();
        let (uid, header) = bearer(&codec, Some(Role::Admin), Utc::now());

        let principal = gate
            .authorize(Some(header.as_str()), Access::Role(Role::Admin))
            .unwrap();
        assert_eq!(principal.user_id, uid);
        assert_eq!(principal.role, Role::Admin);
        assert_eq!(principal.token_id, "jti-1");

        assert!(gate.authorize(Some(header.as_str()), Access::Authenticated).is_ok());
    }
}

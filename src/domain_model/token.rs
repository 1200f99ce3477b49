use super::{Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Claims of a token whose signature has been checked.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VerifiedClaims {
    pub subject: UserId,
    pub role: Option<Role>,
    pub issued_at: i64,
    pub expires_at: i64,
    pub token_id: String,
}

/// Identity attached to a request after the authorization gate lets it through.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub token_id: String,
}

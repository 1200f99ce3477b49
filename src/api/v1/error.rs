use crate::api::v1::handler::ApiResponse;
use crate::application_impl::GateRejection;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{debug, error};
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), code.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::InvalidInput, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::MethodNotAllowed, "Method not allowed".to_string())
    } else {
        error!(?err, "unhandled rejection");
        (ApiErrorCode::InternalError, "Internal error".to_string())
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), message));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid login or password")]
    InvalidCredentials,
    #[error("Authorization header is missing or malformed")]
    MissingToken,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Refresh token is not valid")]
    RefreshTokenInvalid,
    #[error("Forbidden")]
    Forbidden,
    #[error("Login already taken")]
    LoginTaken,
    #[error("Entity already exists")]
    Conflict,
    #[error("Invalid input")]
    InvalidInput,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Service unavailable")]
    Unavailable,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::MissingToken
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::TokenExpired
            | ApiErrorCode::RefreshTokenInvalid => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::LoginTaken | ApiErrorCode::Conflict => StatusCode::CONFLICT,
            ApiErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        error!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn unavailable<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        error!("Store unavailable: {}", error);
        ApiErrorCode::Unavailable
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::TokenMalformed | AuthError::SignatureInvalid => ApiErrorCode::InvalidToken,
            AuthError::TokenExpired => ApiErrorCode::TokenExpired,
            AuthError::RefreshTokenInvalid => ApiErrorCode::RefreshTokenInvalid,
            AuthError::Forbidden => ApiErrorCode::Forbidden,
            AuthError::LoginTaken => ApiErrorCode::LoginTaken,
            AuthError::UserNotFound => ApiErrorCode::NotFound,
            AuthError::InvalidInput(reason) => {
                debug!(%reason, "rejected input");
                ApiErrorCode::InvalidInput
            }
            e @ AuthError::Store { .. } => ApiErrorCode::unavailable(e),
            AuthError::Cancelled => ApiErrorCode::Unavailable,
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<EntityError> for ApiErrorCode {
    fn from(error: EntityError) -> Self {
        match error {
            EntityError::NotFound => ApiErrorCode::NotFound,
            EntityError::Conflict(what) => {
                debug!(%what, "entity conflict");
                ApiErrorCode::Conflict
            }
            e @ EntityError::Store { .. } => ApiErrorCode::unavailable(e),
            EntityError::Cancelled => ApiErrorCode::Unavailable,
        }
    }
}

impl From<GateRejection> for ApiErrorCode {
    fn from(rejection: GateRejection) -> Self {
        match rejection {
            GateRejection::MissingHeader | GateRejection::MalformedHeader => {
                ApiErrorCode::MissingToken
            }
            GateRejection::InvalidToken => ApiErrorCode::InvalidToken,
            GateRejection::ExpiredToken => ApiErrorCode::TokenExpired,
            GateRejection::Forbidden => ApiErrorCode::Forbidden,
        }
    }
}

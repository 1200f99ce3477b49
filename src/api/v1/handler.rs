use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::RequestCtx;
use crate::logger::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn reply_ok<T: Serialize>(data: T) -> warp::reply::Json {
    warp::reply::json(&ApiResponse::ok(data))
}

fn reply_created<T: Serialize>(data: T) -> impl warp::Reply {
    warp::reply::with_status(reply_ok(data), StatusCode::CREATED)
}

fn rejected<E: Into<ApiErrorCode>>(e: E) -> warp::Rejection {
    reject::custom(e.into())
}

// region auth

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub tokens: TokenPair,
}

pub async fn login(
    body: LoginRequest,
    ctx: RequestCtx,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        login: body.login,
        password: body.password,
    };
    let LoginOutput { user_id, tokens } = session_service
        .login(&ctx, login_input)
        .await
        .map_err(rejected)?;

    Ok(reply_ok(LoginResponse { user_id, tokens }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub subject_id: UserId,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

pub async fn refresh(
    body: RefreshRequest,
    ctx: RequestCtx,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let rotate_input = RotateInput {
        subject_id: body.subject_id,
        access_token: body.access_token,
        refresh_token: body.refresh_token,
    };
    let tokens = session_service
        .rotate(&ctx, rotate_input)
        .await
        .map_err(rejected)?;

    Ok(reply_ok(tokens))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: UserId,
}

pub async fn signup(
    body: SignupRequest,
    ctx: RequestCtx,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let signup_input = SignupInput {
        login: body.login,
        password: body.password,
        role: Role::User,
    };
    let user_id = session_service
        .signup(&ctx, signup_input)
        .await
        .map_err(rejected)?;

    Ok(reply_created(SignupResponse { user_id }))
}

// endregion

// region users (admin)

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub login: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

pub async fn list_users(
    principal: Principal,
    ctx: RequestCtx,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    debug!(admin = %principal.user_id, "list users");
    let users = session_service.list_users(&ctx).await.map_err(rejected)?;
    Ok(reply_ok(users))
}

pub async fn create_user(
    principal: Principal,
    body: CreateUserRequest,
    ctx: RequestCtx,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let signup_input = SignupInput {
        login: body.login,
        password: body.password,
        role: body.role,
    };
    let user_id = session_service
        .signup(&ctx, signup_input)
        .await
        .map_err(rejected)?;

    info!(admin = %principal.user_id, %user_id, "user created by admin");
    Ok(reply_created(SignupResponse { user_id }))
}

pub async fn delete_user(
    user_id: UserId,
    principal: Principal,
    ctx: RequestCtx,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    session_service
        .delete_user(&ctx, user_id)
        .await
        .map_err(rejected)?;

    info!(admin = %principal.user_id, %user_id, "user deleted by admin");
    Ok(reply_ok(()))
}

// endregion

// region persons

pub async fn list_persons(
    _principal: Principal,
    ctx: RequestCtx,
    person_service: Arc<dyn EntityService<Person>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let persons = person_service.list(&ctx).await.map_err(rejected)?;
    Ok(reply_ok(persons))
}

pub async fn get_person(
    id: Uuid,
    _principal: Principal,
    ctx: RequestCtx,
    person_service: Arc<dyn EntityService<Person>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let person = person_service.get(&ctx, id).await.map_err(rejected)?;
    Ok(reply_ok(person))
}

pub async fn create_person(
    _principal: Principal,
    body: Person,
    ctx: RequestCtx,
    person_service: Arc<dyn EntityService<Person>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let person = person_service.create(&ctx, body).await.map_err(rejected)?;
    Ok(reply_created(person))
}

pub async fn update_person(
    id: Uuid,
    _principal: Principal,
    body: Person,
    ctx: RequestCtx,
    person_service: Arc<dyn EntityService<Person>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let person = person_service
        .update(&ctx, id, body)
        .await
        .map_err(rejected)?;
    Ok(reply_ok(person))
}

pub async fn delete_person(
    id: Uuid,
    _principal: Principal,
    ctx: RequestCtx,
    person_service: Arc<dyn EntityService<Person>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    person_service.delete(&ctx, id).await.map_err(rejected)?;
    Ok(reply_ok(()))
}

// endregion

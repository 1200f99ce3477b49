use super::error::*;
use super::handler;
use crate::application_impl::{Access, AuthorizationGate};
use crate::domain_model::*;
use crate::domain_port::RequestCtx;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let admin = Access::Role(Role::Admin);
    let authenticated = Access::Authenticated;

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_ctx(server.clone()))
        .and(with(server.session_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_ctx(server.clone()))
        .and(with(server.session_service.clone()))
        .and_then(handler::refresh);

    let signup = warp::post()
        .and(warp::path("signup"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_ctx(server.clone()))
        .and(with(server.session_service.clone()))
        .and_then(handler::signup);

    let list_users = warp::get()
        .and(warp::path("users"))
        .and(warp::path::end())
        .and(with_access(server.gate.clone(), admin))
        .and(with_ctx(server.clone()))
        .and(with(server.session_service.clone()))
        .and_then(handler::list_users);

    let create_user = warp::post()
        .and(warp::path("users"))
        .and(warp::path::end())
        .and(with_access(server.gate.clone(), admin))
        .and(warp::body::json())
        .and(with_ctx(server.clone()))
        .and(with(server.session_service.clone()))
        .and_then(handler::create_user);

    let delete_user = warp::delete()
        .and(warp::path!("users" / UserId))
        .and(with_access(server.gate.clone(), admin))
        .and(with_ctx(server.clone()))
        .and(with(server.session_service.clone()))
        .and_then(handler::delete_user);

    let list_persons = warp::get()
        .and(warp::path("persons"))
        .and(warp::path::end())
        .and(with_access(server.gate.clone(), authenticated))
        .and(with_ctx(server.clone()))
        .and(with(server.person_service.clone()))
        .and_then(handler::list_persons);

    let get_person = warp::get()
        .and(warp::path!("persons" / Uuid))
        .and(with_access(server.gate.clone(), authenticated))
        .and(with_ctx(server.clone()))
        .and(with(server.person_service.clone()))
        .and_then(handler::get_person);

    let create_person = warp::post()
        .and(warp::path("persons"))
        .and(warp::path::end())
        .and(with_access(server.gate.clone(), admin))
        .and(warp::body::json())
        .and(with_ctx(server.clone()))
        .and(with(server.person_service.clone()))
        .and_then(handler::create_person);

    let update_person = warp::put()
        .and(warp::path!("persons" / Uuid))
        .and(with_access(server.gate.clone(), admin))
        .and(warp::body::json())
        .and(with_ctx(server.clone()))
        .and(with(server.person_service.clone()))
        .and_then(handler::update_person);

    let delete_person = warp::delete()
        .and(warp::path!("persons" / Uuid))
        .and(with_access(server.gate.clone(), admin))
        .and(with_ctx(server.clone()))
        .and(with(server.person_service.clone()))
        .and_then(handler::delete_person);

    login
        .or(refresh)
        .or(signup)
        .or(list_users)
        .or(create_user)
        .or(delete_user)
        .or(list_persons)
        .or(get_person)
        .or(create_person)
        .or(update_person)
        .or(delete_person)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Fresh per-request context tied to server shutdown and the request timeout.
fn with_ctx(
    server: Arc<Server>,
) -> impl Filter<Extract = (RequestCtx,), Error = Infallible> + Clone {
    warp::any().map(move || server.request_ctx())
}

fn with_access(
    gate: AuthorizationGate,
    access: Access,
) -> impl Filter<Extract = (Principal,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let gate = gate.clone();
        async move {
            gate.authorize(header.as_deref(), access)
                .map_err(|rejection| reject::custom(ApiErrorCode::from(rejection)))
        }
    })
}

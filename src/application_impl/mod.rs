mod authorization_gate;
mod cache_aside_repository;
mod credential_hasher_argon2;
mod refresh_fingerprint;
mod session_service_impl;
mod token_codec_jwt;

pub use authorization_gate::*;
pub use cache_aside_repository::*;
pub use credential_hasher_argon2::*;
pub use refresh_fingerprint::*;
pub use session_service_impl::*;
pub use token_codec_jwt::*;

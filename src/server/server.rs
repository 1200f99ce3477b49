use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_document::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::{Context, anyhow};
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct Server {
    pub session_service: Arc<dyn SessionService>,
    pub person_service: Arc<dyn EntityService<Person>>,
    pub gate: AuthorizationGate,
    request_timeout: Duration,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let auth = &settings.auth;

        let credential_hasher: Arc<dyn CredentialHasher> =
            Arc::new(Argon2PasswordHasher::new(Argon2Config {
                memory_kib: auth.argon2_memory_kib,
                iterations: auth.argon2_iterations,
                parallelism: auth.argon2_parallelism,
            })?);
        let token_codec: Arc<dyn TokenCodec> =
            Arc::new(JwtHs256Codec::new(auth.signing_key.as_bytes()));
        let fingerprinter = RefreshFingerprinter::new(auth.fingerprint_key.as_bytes())?;

        // region primary store
        let (credential_store, person_store, pool): (
            Arc<dyn CredentialStore>,
            Arc<dyn EntityStore<Person>>,
            Option<Pool<MySql>>,
        ) = match settings.store.backend.as_str() {
            "mysql" => {
                let dsn = settings
                    .store
                    .mysql_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.mysql_dsn is not set"))?;
                let pool = Pool::<MySql>::connect(dsn)
                    .await
                    .context("connect to mysql")?;
                (
                    Arc::new(MySqlCredentialStore::new(pool.clone())),
                    Arc::new(MySqlPersonStore::new(pool.clone())),
                    Some(pool),
                )
            }
            "document" => (
                Arc::new(DocumentCredentialStore::new()),
                Arc::new(DocumentEntityStore::<Person>::new()),
                None,
            ),
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };
        // endregion

        // region cache
        let cache_ttl = Duration::from_secs(settings.cache.ttl_secs);
        let (session_cache, person_cache): (Arc<dyn SessionCache>, Arc<dyn EntityCache<Person>>) =
            match settings.cache.backend.as_str() {
                "redis" => {
                    let dsn = settings
                        .cache
                        .redis_dsn
                        .as_deref()
                        .ok_or_else(|| anyhow!("cache.redis_dsn is not set"))?;
                    let redis_client = redis::Client::open(dsn)?;
                    let redis_manager = redis_client
                        .get_connection_manager()
                        .await
                        .context("connect to redis")?;
                    (
                        Arc::new(RedisSessionCache::new(
                            redis_manager.clone(),
                            settings.cache.prefix.clone(),
                        )),
                        Arc::new(RedisEntityCache::new(
                            redis_manager,
                            settings.cache.prefix.clone(),
                            cache_ttl,
                        )),
                    )
                }
                "memory" => (
                    Arc::new(MemorySessionCache::new()),
                    Arc::new(MemoryEntityCache::new(cache_ttl)),
                ),
                other => return Err(anyhow!("Unknown cache backend: {}", other)),
            };
        // endregion

        let session_service: Arc<dyn SessionService> = Arc::new(RealSessionService::new(
            credential_store,
            session_cache,
            credential_hasher,
            token_codec.clone(),
            fingerprinter,
            SessionConfig {
                access_ttl: Duration::from_secs(auth.access_ttl_secs),
                refresh_ttl: Duration::from_secs(auth.refresh_ttl_secs),
            },
        ));
        let person_service: Arc<dyn EntityService<Person>> =
            Arc::new(CacheAsideRepository::new(person_store, person_cache));
        let gate = AuthorizationGate::new(token_codec);

        info!(
            store = %settings.store.backend,
            cache = %settings.cache.backend,
            "server started"
        );

        Ok(Self {
            session_service,
            person_service,
            gate,
            request_timeout: Duration::from_millis(settings.http.request_timeout_ms),
            cancel: CancellationToken::new(),
            pool,
        })
    }

    /// Context for one inbound request: cancelled on shutdown, bounded by
    /// the configured request timeout.
    pub fn request_ctx(&self) -> RequestCtx {
        RequestCtx::child_of(&self.cancel).timeout_after(self.request_timeout)
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("mysql pool closed");
        }
    }
}

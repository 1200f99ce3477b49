use super::RefreshFingerprinter;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Hashed once per service and verified against on an unknown login.
const DUMMY_PASSWORD: &str = "warden-dummy-password";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

pub struct RealSessionService {
    credential_store: Arc<dyn CredentialStore>,
    session_cache: Arc<dyn SessionCache>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    fingerprinter: RefreshFingerprinter,
    config: SessionConfig,
    min_password_len: usize,
    dummy_hash: OnceCell<String>,
}

impl RealSessionService {
    pub fn new(
        credential_store: Arc<dyn CredentialStore>,
        session_cache: Arc<dyn SessionCache>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        fingerprinter: RefreshFingerprinter,
        config: SessionConfig,
    ) -> Self {
        Self {
            credential_store,
            session_cache,
            credential_hasher,
            token_codec,
            fingerprinter,
            config,
            min_password_len: 6,
            dummy_hash: OnceCell::new(),
        }
    }

    fn validate_signup(&self, login: &str, password: &str) -> Result<(), AuthError> {
        if login.trim().is_empty() {
            return Err(AuthError::InvalidInput("login is empty".to_string()));
        }
        if password.len() < self.min_password_len {
            return Err(AuthError::InvalidInput("password too short".to_string()));
        }
        Ok(())
    }

    /// Spends the same argon2 work as a real mismatch so an unknown login
    /// takes as long as a wrong password.
    async fn reject_unknown_login(&self, password: &str) -> AuthError {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.credential_hasher.hash_password(DUMMY_PASSWORD))
            .await;
        match dummy {
            Ok(hash) => {
                if let Err(e) = self.credential_hasher.verify_password(password, hash).await {
                    warn!(error = %e, "dummy hash verification failed");
                }
            }
            Err(e) => warn!(error = %e, "dummy hash unavailable"),
        }
        AuthError::InvalidCredentials
    }

    #[inline]
    fn new_jti() -> String {
        Uuid::new_v4().to_string()
    }

    /// Issues an access token (with role) and a refresh token (without)
    /// bound together by `jti`.
    fn issue_pair(
        &self,
        user_id: UserId,
        role: Role,
        jti: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let (access, access_exp) =
            self.token_codec
                .issue(user_id, Some(role), jti, now, self.config.access_ttl)?;
        let (refresh, refresh_exp) =
            self.token_codec
                .issue(user_id, None, jti, now, self.config.refresh_ttl)?;
        Ok(TokenPair {
            access_token: AccessToken(access),
            refresh_token: RefreshToken(refresh),
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    /// Internal consistency check on a freshly issued pair.
    fn cross_check(&self, pair: &TokenPair, now: DateTime<Utc>) -> Result<(), AuthError> {
        let access = self.token_codec.parse(&pair.access_token.0, now)?;
        let refresh = self.token_codec.parse(&pair.refresh_token.0, now)?;
        if access.token_id != refresh.token_id || access.subject != refresh.subject {
            return Err(AuthError::InternalError(
                "issued token pair does not share a jti".to_string(),
            ));
        }
        Ok(())
    }

    /// Cache first; a miss or a cache failure falls back to the primary store.
    async fn stored_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
    ) -> Result<Fingerprint, AuthError> {
        match self.session_cache.get_fingerprint(ctx, user_id).await {
            Ok(Some(fp)) => return Ok(fp),
            Ok(None) => debug!(%user_id, "session cache miss"),
            Err(CacheError::Interrupted(_)) => return Err(AuthError::Cancelled),
            Err(e) => warn!(%user_id, error = %e, "session cache read failed, using primary"),
        }

        match self
            .credential_store
            .get_refresh_fingerprint(ctx, user_id)
            .await
        {
            Ok(Some(fp)) => Ok(fp),
            Ok(None) | Err(StoreError::NotFound) => Err(AuthError::RefreshTokenInvalid),
            Err(e) => {
                error!(%user_id, error = %e, "get_refresh_fingerprint failed");
                Err(AuthError::store("get_refresh_fingerprint", e))
            }
        }
    }

    /// Invalidate cache, write primary, repopulate cache. Only the primary
    /// write can fail the call.
    async fn persist_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
        fingerprint: &Fingerprint,
    ) -> Result<(), AuthError> {
        if let Err(e) = self.session_cache.invalidate(ctx, user_id).await {
            warn!(%user_id, error = %e, "session cache invalidate failed");
        }

        self.credential_store
            .set_refresh_fingerprint(ctx, user_id, fingerprint)
            .await
            .map_err(|e| {
                error!(%user_id, error = %e, "set_refresh_fingerprint failed");
                AuthError::store("set_refresh_fingerprint", e)
            })?;

        if let Err(e) = self
            .session_cache
            .set_fingerprint(ctx, user_id, fingerprint, self.config.refresh_ttl)
            .await
        {
            warn!(%user_id, error = %e, "session cache write failed");
            if let Err(e) = self.session_cache.invalidate(ctx, user_id).await {
                warn!(%user_id, error = %e, "session cache invalidate after failed write");
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn signup(&self, ctx: &RequestCtx, request: SignupInput) -> Result<UserId, AuthError> {
        let SignupInput {
            login,
            password,
            role,
        } = request;

        self.validate_signup(&login, &password)?;

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let user_id = UserId::new_random();
        self.credential_store
            .create(
                ctx,
                NewCredential {
                    id: user_id,
                    login,
                    password_hash,
                    role,
                },
            )
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::LoginTaken,
                other => AuthError::store("create_credential", other),
            })?;

        info!(%user_id, %role, "user signed up");
        Ok(user_id)
    }

    async fn login(
        &self,
        ctx: &RequestCtx,
        request: LoginInput,
    ) -> Result<LoginOutput, AuthError> {
        let LoginInput { login, password } = request;

        let rec = self
            .credential_store
            .get_by_login(ctx, &login)
            .await
            .map_err(|e| AuthError::store("get_by_login", e))?;
        let Some(rec) = rec else {
            debug!("unknown login");
            return Err(self.reject_unknown_login(&password).await);
        };

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            debug!(user_id = %rec.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let jti = Self::new_jti();
        let pair = self.issue_pair(rec.id, rec.role, &jti, now)?;

        let fingerprint = self.fingerprinter.digest(rec.id, &pair.refresh_token.0);
        self.persist_fingerprint(ctx, rec.id, &fingerprint).await?;

        self.cross_check(&pair, now)?;

        info!(user_id = %rec.id, role = %rec.role, "login succeeded");
        Ok(LoginOutput {
            user_id: rec.id,
            tokens: pair,
        })
    }

    async fn rotate(
        &self,
        ctx: &RequestCtx,
        request: RotateInput,
    ) -> Result<TokenPair, AuthError> {
        let RotateInput {
            subject_id,
            access_token,
            refresh_token,
        } = request;

        let stored = self.stored_fingerprint(ctx, subject_id).await?;
        if !self
            .fingerprinter
            .matches(subject_id, &refresh_token.0, &stored)
        {
            warn!(user_id = %subject_id, "refresh token does not match stored fingerprint");
            return Err(AuthError::RefreshTokenInvalid);
        }

        let now = Utc::now();
        let refresh_claims = self.token_codec.parse(&refresh_token.0, now)?;
        if refresh_claims.subject != subject_id {
            return Err(AuthError::RefreshTokenInvalid);
        }

        // The access token may be expired; its signature still guards the role.
        let access_claims = self.token_codec.parse_ignoring_expiry(&access_token.0)?;
        if access_claims.subject != subject_id {
            return Err(AuthError::RefreshTokenInvalid);
        }
        let role = access_claims.role.ok_or(AuthError::TokenMalformed)?;

        let jti = Self::new_jti();
        let pair = self.issue_pair(subject_id, role, &jti, now)?;

        // Last writer wins: two concurrent rotations can both get here.
        let fingerprint = self.fingerprinter.digest(subject_id, &pair.refresh_token.0);
        self.persist_fingerprint(ctx, subject_id, &fingerprint)
            .await?;

        self.cross_check(&pair, now)?;

        info!(user_id = %subject_id, "refresh token rotated");
        Ok(pair)
    }

    async fn list_users(&self, ctx: &RequestCtx) -> Result<Vec<UserSummary>, AuthError> {
        let credentials = self
            .credential_store
            .list(ctx)
            .await
            .map_err(|e| AuthError::store("list_credentials", e))?;
        Ok(credentials.iter().map(UserSummary::from).collect())
    }

    async fn delete_user(&self, ctx: &RequestCtx, user_id: UserId) -> Result<(), AuthError> {
        self.credential_store
            .delete(ctx, user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::UserNotFound,
                other => AuthError::store("delete_credential", other),
            })?;

        if let Err(e) = self.session_cache.invalidate(ctx, user_id).await {
            warn!(%user_id, error = %e, "session cache invalidate failed");
        }

        info!(%user_id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2PasswordHasher, JwtHs256Codec, cheap_hasher};
    use crate::infra_document::{DocumentCredentialStore, MemorySessionCache};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    const SIGNING_KEY: &[u8] = b"test-signing-key";

    struct Fixture {
        service: Arc<RealSessionService>,
        store: Arc<dyn CredentialStore>,
        codec: Arc<JwtHs256Codec>,
        fingerprinter: RefreshFingerprinter,
    }

    fn fixture_with(store: Arc<dyn CredentialStore>, cache: Arc<dyn SessionCache>) -> Fixture {
        let codec = Arc::new(JwtHs256Codec::new(SIGNING_KEY));
        let fingerprinter = RefreshFingerprinter::new(b"test-fingerprint-key").unwrap();
        let service = Arc::new(RealSessionService::new(
            store.clone(),
            cache,
            Arc::new(cheap_hasher()),
            codec.clone(),
            fingerprinter.clone(),
            SessionConfig {
                access_ttl: Duration::from_secs(3600),
                refresh_ttl: Duration::from_secs(72 * 3600),
            },
        ));
        Fixture {
            service,
            store,
            codec,
            fingerprinter,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(
            Arc::new(DocumentCredentialStore::new()),
            Arc::new(MemorySessionCache::new()),
        )
    }

    async fn seed(f: &Fixture, login: &str, password: &str, role: Role) -> UserId {
        f.service
            .signup(
                &RequestCtx::new(),
                SignupInput {
                    login: login.to_string(),
                    password: password.to_string(),
                    role,
                },
            )
            .await
            .unwrap()
    }

    async fn login_as(
        f: &Fixture,
        login: &str,
        password: &str,
    ) -> Result<LoginOutput, AuthError> {
        f.service
            .login(
                &RequestCtx::new(),
                LoginInput {
                    login: login.to_string(),
                    password: password.to_string(),
                },
            )
            .await
    }

    async fn login(f: &Fixture, login: &str, password: &str) -> Result<TokenPair, AuthError> {
        login_as(f, login, password).await.map(|out| out.tokens)
    }

    async fn rotate(f: &Fixture, uid: UserId, pair: &TokenPair) -> Result<TokenPair, AuthError> {
        f.service
            .rotate(
                &RequestCtx::new(),
                RotateInput {
                    subject_id: uid,
                    access_token: pair.access_token.clone(),
                    refresh_token: pair.refresh_token.clone(),
                },
            )
            .await
    }

    async fn stored(f: &Fixture, uid: UserId) -> Option<Fingerprint> {
        f.store
            .get_refresh_fingerprint(&RequestCtx::new(), uid)
            .await
            .unwrap()
    }

    /// Cache that fails every call.
    struct BrokenCache;

    #[async_trait::async_trait]
    impl SessionCache for BrokenCache {
        async fn get_fingerprint(
            &self,
            _ctx: &RequestCtx,
            _user_id: UserId,
        ) -> Result<Option<Fingerprint>, CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn set_fingerprint(
            &self,
            _ctx: &RequestCtx,
            _user_id: UserId,
            _fingerprint: &Fingerprint,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn invalidate(&self, _ctx: &RequestCtx, _user_id: UserId) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
    }

    /// Delegating store with switchable write failures, a read counter,
    /// and an optional barrier that holds fingerprint reads.
    struct ScriptedStore {
        inner: DocumentCredentialStore,
        fail_fingerprint_writes: AtomicBool,
        fingerprint_reads: AtomicUsize,
        read_barrier: Mutex<Option<Arc<Barrier>>>,
    }

    impl ScriptedStore {
        fn new() -> Self {
            ScriptedStore {
                inner: DocumentCredentialStore::new(),
                fail_fingerprint_writes: AtomicBool::new(false),
                fingerprint_reads: AtomicUsize::new(0),
                read_barrier: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl CredentialStore for ScriptedStore {
        async fn create(
            &self,
            ctx: &RequestCtx,
            credential: NewCredential,
        ) -> Result<(), StoreError> {
            self.inner.create(ctx, credential).await
        }

        async fn get_by_login(
            &self,
            ctx: &RequestCtx,
            login: &str,
        ) -> Result<Option<Credential>, StoreError> {
            self.inner.get_by_login(ctx, login).await
        }

        async fn list(&self, ctx: &RequestCtx) -> Result<Vec<Credential>, StoreError> {
            self.inner.list(ctx).await
        }

        async fn get_refresh_fingerprint(
            &self,
            ctx: &RequestCtx,
            user_id: UserId,
        ) -> Result<Option<Fingerprint>, StoreError> {
            self.fingerprint_reads.fetch_add(1, Ordering::SeqCst);
            let out = self.inner.get_refresh_fingerprint(ctx, user_id).await;
            let barrier = self.read_barrier.lock().unwrap().clone();
            if let Some(barrier) = barrier {
                barrier.wait().await;
            }
            out
        }

        async fn set_refresh_fingerprint(
            &self,
            ctx: &RequestCtx,
            user_id: UserId,
            fingerprint: &Fingerprint,
        ) -> Result<(), StoreError> {
            if self.fail_fingerprint_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("primary down".to_string()));
            }
            self.inner
                .set_refresh_fingerprint(ctx, user_id, fingerprint)
                .await
        }

        async fn delete(&self, ctx: &RequestCtx, user_id: UserId) -> Result<(), StoreError> {
            self.inner.delete(ctx, user_id).await
        }
    }

    #[tokio::test]
    async fn admin_login_issues_admin_token_and_stores_fingerprint() {
        let f = fixture();
        let uid = seed(&f, "alice", "correct-pw", Role::Admin).await;

        let out = login_as(&f, "alice", "correct-pw").await.unwrap();
        assert_eq!(out.user_id, uid);
        let pair = out.tokens;

        let now = Utc::now();
        let access = f.codec.parse(&pair.access_token.0, now).unwrap();
        let refresh = f.codec.parse(&pair.refresh_token.0, now).unwrap();
        assert_eq!(access.role, Some(Role::Admin));
        assert_eq!(access.subject, uid);
        assert_eq!(refresh.role, None);
        assert_eq!(access.token_id, refresh.token_id);

        let expected = f.fingerprinter.digest(uid, &pair.refresh_token.0);
        assert_eq!(stored(&f, uid).await, Some(expected));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials_and_leaves_fingerprint() {
        let f = fixture();
        let uid = seed(&f, "alice", "correct-pw", Role::Admin).await;
        login(&f, "alice", "correct-pw").await.unwrap();
        let before = stored(&f, uid).await;

        let result = login(&f, "alice", "wrong-pw").await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert_eq!(stored(&f, uid).await, before);
    }

    #[tokio::test]
    async fn unknown_login_is_indistinguishable_from_wrong_password() {
        let f = fixture();
        seed(&f, "alice", "correct-pw", Role::User).await;

        let unknown = login(&f, "mallory", "correct-pw").await.unwrap_err();
        let wrong = login(&f, "alice", "nope-nope").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    /// Counts verifications so tests can see the argon2 work was spent.
    struct CountingHasher {
        inner: Argon2PasswordHasher,
        verifies: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CredentialHasher for CountingHasher {
        async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
            self.inner.hash_password(password).await
        }

        async fn verify_password(
            &self,
            password: &str,
            password_hash: &str,
        ) -> Result<bool, AuthError> {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            self.inner.verify_password(password, password_hash).await
        }
    }

    #[tokio::test]
    async fn unknown_login_still_verifies_a_hash() {
        let hasher = Arc::new(CountingHasher {
            inner: cheap_hasher(),
            verifies: AtomicUsize::new(0),
        });
        let service = RealSessionService::new(
            Arc::new(DocumentCredentialStore::new()),
            Arc::new(MemorySessionCache::new()),
            hasher.clone(),
            Arc::new(JwtHs256Codec::new(SIGNING_KEY)),
            RefreshFingerprinter::new(b"test-fingerprint-key").unwrap(),
            SessionConfig {
                access_ttl: Duration::from_secs(3600),
                refresh_ttl: Duration::from_secs(3600),
            },
        );

        for attempt in 1..=2 {
            let result = service
                .login(
                    &RequestCtx::new(),
                    LoginInput {
                        login: "nobody".to_string(),
                        password: DUMMY_PASSWORD.to_string(),
                    },
                )
                .await;
            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
            assert_eq!(hasher.verifies.load(Ordering::SeqCst), attempt);
        }
    }

    #[tokio::test]
    async fn rotation_is_single_use() {
        let f = fixture();
        let uid = seed(&f, "alice", "correct-pw", Role::User).await;
        let original = login(&f, "alice", "correct-pw").await.unwrap();

        let rotated = rotate(&f, uid, &original).await.unwrap();
        assert_ne!(rotated.refresh_token, original.refresh_token);
        let claims = f.codec.parse(&rotated.access_token.0, Utc::now()).unwrap();
        assert_eq!(claims.role, Some(Role::User));

        let replay = rotate(&f, uid, &original).await;
        assert!(matches!(replay, Err(AuthError::RefreshTokenInvalid)));

        // The fresh pair keeps working.
        rotate(&f, uid, &rotated).await.unwrap();
    }

    #[tokio::test]
    async fn rotation_issues_a_new_jti() {
        let f = fixture();
        let uid = seed(&f, "alice", "correct-pw", Role::User).await;
        let original = login(&f, "alice", "correct-pw").await.unwrap();
        let rotated = rotate(&f, uid, &original).await.unwrap();

        let now = Utc::now();
        let old_jti = f.codec.parse(&original.access_token.0, now).unwrap().token_id;
        let new_access = f.codec.parse(&rotated.access_token.0, now).unwrap();
        let new_refresh = f.codec.parse(&rotated.refresh_token.0, now).unwrap();
        assert_ne!(new_access.token_id, old_jti);
        assert_eq!(new_access.token_id, new_refresh.token_id);
    }

    #[tokio::test]
    async fn rotation_rejects_garbage_refresh_tokens_without_panicking() {
        let f = fixture();
        let uid = seed(&f, "alice", "correct-pw", Role::User).await;
        let pair = login(&f, "alice", "correct-pw").await.unwrap();

        for bogus in ["", ".", "a.b.c", "not-a-token", pair.access_token.0.as_str()] {
            let mut presented = pair.clone();
            presented.refresh_token = RefreshToken(bogus.to_string());
            assert!(
                matches!(
                    rotate(&f, uid, &presented).await,
                    Err(AuthError::RefreshTokenInvalid)
                ),
                "accepted {bogus:?}"
            );
        }
        // Nothing above disturbed the stored fingerprint.
        rotate(&f, uid, &pair).await.unwrap();
    }

    #[tokio::test]
    async fn rotation_before_any_login_is_rejected() {
        let f = fixture();
        let uid = seed(&f, "alice", "correct-pw", Role::User).await;
        let stranger_pair = {
            let other = fixture();
            seed(&other, "bob", "correct-pw", Role::User).await;
            login(&other, "bob", "correct-pw").await.unwrap()
        };
        assert!(matches!(
            rotate(&f, uid, &stranger_pair).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
        assert!(matches!(
            rotate(&f, UserId::new_random(), &stranger_pair).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
    }

    #[tokio::test]
    async fn rotation_cannot_escalate_role_with_forged_access_token() {
        let f = fixture();
        let uid = seed(&f, "alice", "correct-pw", Role::User).await;
        let mut pair = login(&f, "alice", "correct-pw").await.unwrap();

        let forger = JwtHs256Codec::new(b"attacker-key");
        let (forged, _) = forger
            .issue(uid, Some(Role::Admin), "x", Utc::now(), Duration::from_secs(60))
            .unwrap();
        pair.access_token = AccessToken(forged);

        assert!(matches!(
            rotate(&f, uid, &pair).await,
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn rotation_accepts_expired_access_token() {
        let f = fixture();
        let uid = seed(&f, "alice", "correct-pw", Role::Admin).await;
        let mut pair = login(&f, "alice", "correct-pw").await.unwrap();

        let jti = f.codec.parse(&pair.access_token.0, Utc::now()).unwrap().token_id;
        let long_ago = Utc::now() - chrono::Duration::hours(5);
        let (expired, _) = f
            .codec
            .issue(uid, Some(Role::Admin), &jti, long_ago, Duration::from_secs(60))
            .unwrap();
        pair.access_token = AccessToken(expired);

        let rotated = rotate(&f, uid, &pair).await.unwrap();
        let claims = f.codec.parse(&rotated.access_token.0, Utc::now()).unwrap();
        assert_eq!(claims.role, Some(Role::Admin));
    }

    #[tokio::test]
    async fn rotation_rejects_other_subjects_access_token() {
        let f = fixture();
        let alice = seed(&f, "alice", "correct-pw", Role::User).await;
        seed(&f, "admin1", "correct-pw", Role::Admin).await;
        let mut alice_pair = login(&f, "alice", "correct-pw").await.unwrap();
        let admin_pair = login(&f, "admin1", "correct-pw").await.unwrap();

        alice_pair.access_token = admin_pair.access_token;
        assert!(matches!(
            rotate(&f, alice, &alice_pair).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
    }

    #[tokio::test]
    async fn broken_cache_degrades_to_primary() {
        let f = fixture_with(
            Arc::new(DocumentCredentialStore::new()),
            Arc::new(BrokenCache),
        );
        let uid = seed(&f, "alice", "correct-pw", Role::User).await;

        let pair = login(&f, "alice", "correct-pw").await.unwrap();
        let rotated = rotate(&f, uid, &pair).await.unwrap();
        assert!(matches!(
            rotate(&f, uid, &pair).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
        rotate(&f, uid, &rotated).await.unwrap();
    }

    #[tokio::test]
    async fn cache_hit_skips_primary_read() {
        let store = Arc::new(ScriptedStore::new());
        let f = fixture_with(store.clone(), Arc::new(MemorySessionCache::new()));
        let uid = seed(&f, "alice", "correct-pw", Role::User).await;
        let pair = login(&f, "alice", "correct-pw").await.unwrap();

        rotate(&f, uid, &pair).await.unwrap();
        assert_eq!(store.fingerprint_reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_primary_write_returns_no_tokens_and_keeps_old_session() {
        let store = Arc::new(ScriptedStore::new());
        let f = fixture_with(store.clone(), Arc::new(MemorySessionCache::new()));
        let uid = seed(&f, "alice", "correct-pw", Role::User).await;
        let pair = login(&f, "alice", "correct-pw").await.unwrap();

        store.fail_fingerprint_writes.store(true, Ordering::SeqCst);
        let result = rotate(&f, uid, &pair).await;
        assert!(matches!(
            result,
            Err(AuthError::Store {
                op: "set_refresh_fingerprint",
                ..
            })
        ));
        let login_result = login(&f, "alice", "correct-pw").await;
        assert!(matches!(login_result, Err(AuthError::Store { .. })));

        store.fail_fingerprint_writes.store(false, Ordering::SeqCst);
        rotate(&f, uid, &pair).await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_request_returns_no_tokens() {
        let f = fixture();
        seed(&f, "alice", "correct-pw", Role::User).await;
        let ctx = RequestCtx::new();
        ctx.cancel();
        let result = f
            .service
            .login(
                &ctx,
                LoginInput {
                    login: "alice".to_string(),
                    password: "correct-pw".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(AuthError::Cancelled)));
    }

    // Two rotations racing on the same fingerprint both succeed; only the
    // last write survives, so exactly one of the new refresh tokens works.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_rotations_both_succeed_last_writer_wins() {
        let store = Arc::new(ScriptedStore::new());
        let f = fixture_with(store.clone(), Arc::new(BrokenCache));
        let uid = seed(&f, "alice", "correct-pw", Role::User).await;
        let pair = login(&f, "alice", "correct-pw").await.unwrap();

        *store.read_barrier.lock().unwrap() = Some(Arc::new(Barrier::new(2)));
        let (a, b) = tokio::join!(rotate(&f, uid, &pair), rotate(&f, uid, &pair));
        *store.read_barrier.lock().unwrap() = None;

        let a = a.unwrap();
        let b = b.unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);

        let current = stored(&f, uid).await.unwrap();
        let a_live = f.fingerprinter.matches(uid, &a.refresh_token.0, &current);
        let b_live = f.fingerprinter.matches(uid, &b.refresh_token.0, &current);
        assert!(a_live ^ b_live, "exactly one new refresh token survives");

        let (winner, loser) = if a_live { (a, b) } else { (b, a) };
        assert!(matches!(
            rotate(&f, uid, &loser).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
        rotate(&f, uid, &winner).await.unwrap();
    }

    #[tokio::test]
    async fn signup_rejects_duplicates_and_short_passwords() {
        let f = fixture();
        seed(&f, "alice", "correct-pw", Role::User).await;

        let dup = f
            .service
            .signup(
                &RequestCtx::new(),
                SignupInput {
                    login: "alice".to_string(),
                    password: "another-pw".to_string(),
                    role: Role::User,
                },
            )
            .await;
        assert!(matches!(dup, Err(AuthError::LoginTaken)));

        let short = f
            .service
            .signup(
                &RequestCtx::new(),
                SignupInput {
                    login: "bob".to_string(),
                    password: "pw".to_string(),
                    role: Role::User,
                },
            )
            .await;
        assert!(matches!(short, Err(AuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn deleted_user_cannot_rotate_or_login() {
        let f = fixture();
        let uid = seed(&f, "alice", "correct-pw", Role::User).await;
        let pair = login(&f, "alice", "correct-pw").await.unwrap();
        let ctx = RequestCtx::new();

        let users = f.service.list_users(&ctx).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].login, "alice");

        f.service.delete_user(&ctx, uid).await.unwrap();
        assert!(matches!(
            rotate(&f, uid, &pair).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
        assert!(matches!(
            login(&f, "alice", "correct-pw").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            f.service.delete_user(&ctx, uid).await,
            Err(AuthError::UserNotFound)
        ));
    }
}

use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

/// Credentials kept as JSON documents keyed by user id, with a unique
/// login index. Interchangeable with the relational store.
pub struct DocumentCredentialStore {
    docs: DashMap<UserId, Value>,
    logins: DashMap<String, UserId>,
}

impl DocumentCredentialStore {
    pub fn new() -> Self {
        DocumentCredentialStore {
            docs: DashMap::new(),
            logins: DashMap::new(),
        }
    }

    fn load(&self, user_id: UserId) -> Result<Option<Credential>, StoreError> {
        match self.docs.get(&user_id) {
            Some(doc) => serde_json::from_value(doc.value().clone())
                .map(Some)
                .map_err(StoreError::unavailable),
            None => Ok(None),
        }
    }
}

impl Default for DocumentCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CredentialStore for DocumentCredentialStore {
    async fn create(&self, ctx: &RequestCtx, credential: NewCredential) -> Result<(), StoreError> {
        ctx.check()?;
        let doc = serde_json::to_value(Credential {
            id: credential.id,
            login: credential.login.clone(),
            password_hash: credential.password_hash,
            role: credential.role,
            refresh_fingerprint: None,
        })
        .map_err(StoreError::unavailable)?;

        match self.logins.entry(credential.login) {
            Entry::Occupied(e) => Err(StoreError::Conflict(format!("login {}", e.key()))),
            Entry::Vacant(e) => {
                self.docs.insert(credential.id, doc);
                e.insert(credential.id);
                Ok(())
            }
        }
    }

    async fn get_by_login(
        &self,
        ctx: &RequestCtx,
        login: &str,
    ) -> Result<Option<Credential>, StoreError> {
        ctx.check()?;
        let Some(user_id) = self.logins.get(login).map(|id| *id) else {
            return Ok(None);
        };
        self.load(user_id)
    }

    async fn list(&self, ctx: &RequestCtx) -> Result<Vec<Credential>, StoreError> {
        ctx.check()?;
        self.docs
            .iter()
            .map(|doc| serde_json::from_value(doc.value().clone()).map_err(StoreError::unavailable))
            .collect()
    }

    async fn get_refresh_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
    ) -> Result<Option<Fingerprint>, StoreError> {
        ctx.check()?;
        let credential = self.load(user_id)?.ok_or(StoreError::NotFound)?;
        Ok(credential.refresh_fingerprint)
    }

    async fn set_refresh_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
        fingerprint: &Fingerprint,
    ) -> Result<(), StoreError> {
        ctx.check()?;
        let mut doc = self.docs.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        let value = serde_json::to_value(fingerprint).map_err(StoreError::unavailable)?;
        match doc.value_mut() {
            Value::Object(fields) => {
                fields.insert("refresh_fingerprint".to_string(), value);
                Ok(())
            }
            _ => Err(StoreError::Unavailable(format!("corrupt document for {user_id}"))),
        }
    }

    async fn delete(&self, ctx: &RequestCtx, user_id: UserId) -> Result<(), StoreError> {
        ctx.check()?;
        let (_, doc) = self.docs.remove(&user_id).ok_or(StoreError::NotFound)?;
        if let Some(login) = doc.get("login").and_then(Value::as_str) {
            self.logins.remove(login);
        }
        Ok(())
    }
}

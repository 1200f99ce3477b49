use super::util::store_err;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlCredentialStore {
    pool: MySqlPool,
}

impl MySqlCredentialStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlCredentialStore { pool }
    }

    fn row_to_credential(row: MySqlRow) -> Result<Credential, StoreError> {
        let id: UserId = row.try_get("id").map_err(store_err)?;
        let login: String = row.try_get("login").map_err(store_err)?;
        let password_hash: String = row.try_get("password_hash").map_err(store_err)?;
        let role: String = row.try_get("role").map_err(store_err)?;
        let role = role.parse::<Role>().map_err(StoreError::unavailable)?;
        let refresh_fingerprint: Option<Vec<u8>> =
            row.try_get("refresh_fingerprint").map_err(store_err)?;

        Ok(Credential {
            id,
            login,
            password_hash,
            role,
            refresh_fingerprint: Self::decode_fingerprint(refresh_fingerprint)?,
        })
    }

    fn decode_fingerprint(bytes: Option<Vec<u8>>) -> Result<Option<Fingerprint>, StoreError> {
        bytes
            .map(Fingerprint::from_bytes)
            .transpose()
            .map_err(StoreError::unavailable)
    }

    async fn exists(&self, ctx: &RequestCtx, user_id: UserId) -> Result<bool, StoreError> {
        let count: i64 = ctx
            .run(
                sqlx::query_scalar("SELECT COUNT(1) FROM user_credential WHERE id = ?")
                    .bind(user_id)
                    .fetch_one(&self.pool),
            )
            .await?
            .map_err(store_err)?;
        Ok(count > 0)
    }
}

#[async_trait::async_trait]
impl CredentialStore for MySqlCredentialStore {
    async fn create(&self, ctx: &RequestCtx, credential: NewCredential) -> Result<(), StoreError> {
        ctx.run(
            sqlx::query(
                r#"
INSERT INTO user_credential (id, login, password_hash, role)
VALUES (?, ?, ?, ?)
"#,
            )
            .bind(credential.id)
            .bind(&credential.login)
            .bind(&credential.password_hash)
            .bind(credential.role.as_str())
            .execute(&self.pool),
        )
        .await?
        .map_err(store_err)?;

        Ok(())
    }

    async fn get_by_login(
        &self,
        ctx: &RequestCtx,
        login: &str,
    ) -> Result<Option<Credential>, StoreError> {
        let row_opt: Option<MySqlRow> = ctx
            .run(
                sqlx::query(
                    r#"
SELECT id, login, password_hash, role, refresh_fingerprint
FROM user_credential
WHERE login = ?
"#,
                )
                .bind(login)
                .fetch_optional(&self.pool),
            )
            .await?
            .map_err(store_err)?;

        row_opt.map(Self::row_to_credential).transpose()
    }

    async fn list(&self, ctx: &RequestCtx) -> Result<Vec<Credential>, StoreError> {
        let rows: Vec<MySqlRow> = ctx
            .run(
                sqlx::query(
                    r#"
SELECT id, login, password_hash, role, refresh_fingerprint
FROM user_credential
ORDER BY login
"#,
                )
                .fetch_all(&self.pool),
            )
            .await?
            .map_err(store_err)?;

        rows.into_iter().map(Self::row_to_credential).collect()
    }

    async fn get_refresh_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
    ) -> Result<Option<Fingerprint>, StoreError> {
        let row = ctx
            .run(
                sqlx::query("SELECT refresh_fingerprint FROM user_credential WHERE id = ?")
                    .bind(user_id)
                    .fetch_optional(&self.pool),
            )
            .await?
            .map_err(store_err)?
            .ok_or(StoreError::NotFound)?;

        let bytes: Option<Vec<u8>> = row.try_get("refresh_fingerprint").map_err(store_err)?;
        Self::decode_fingerprint(bytes)
    }

    async fn set_refresh_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
        fingerprint: &Fingerprint,
    ) -> Result<(), StoreError> {
        let result = ctx
            .run(
                sqlx::query("UPDATE user_credential SET refresh_fingerprint = ? WHERE id = ?")
                    .bind(fingerprint.as_bytes())
                    .bind(user_id)
                    .execute(&self.pool),
            )
            .await?
            .map_err(store_err)?;

        // MySQL reports 0 affected rows when the value is unchanged.
        if result.rows_affected() == 0 && !self.exists(ctx, user_id).await? {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, ctx: &RequestCtx, user_id: UserId) -> Result<(), StoreError> {
        let result = ctx
            .run(
                sqlx::query("DELETE FROM user_credential WHERE id = ?")
                    .bind(user_id)
                    .execute(&self.pool),
            )
            .await?
            .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

use super::util::store_err;
use crate::domain_model::Person;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

pub struct MySqlPersonStore {
    pool: MySqlPool,
}

impl MySqlPersonStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlPersonStore { pool }
    }

    fn row_to_person(row: MySqlRow) -> Result<Person, StoreError> {
        Ok(Person {
            id: row.try_get("id").map_err(store_err)?,
            name: row.try_get("name").map_err(store_err)?,
            age: row.try_get("age").map_err(store_err)?,
            is_healthy: row.try_get("is_healthy").map_err(store_err)?,
        })
    }

    async fn exists(&self, ctx: &RequestCtx, id: Uuid) -> Result<bool, StoreError> {
        let count: i64 = ctx
            .run(
                sqlx::query_scalar("SELECT COUNT(1) FROM person WHERE id = ?")
                    .bind(id)
                    .fetch_one(&self.pool),
            )
            .await?
            .map_err(store_err)?;
        Ok(count > 0)
    }
}

#[async_trait::async_trait]
impl EntityStore<Person> for MySqlPersonStore {
    async fn get(&self, ctx: &RequestCtx, id: Uuid) -> Result<Option<Person>, StoreError> {
        let row_opt = ctx
            .run(
                sqlx::query("SELECT id, name, age, is_healthy FROM person WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?
            .map_err(store_err)?;

        row_opt.map(Self::row_to_person).transpose()
    }

    async fn list(&self, ctx: &RequestCtx) -> Result<Vec<Person>, StoreError> {
        let rows = ctx
            .run(
                sqlx::query("SELECT id, name, age, is_healthy FROM person ORDER BY name")
                    .fetch_all(&self.pool),
            )
            .await?
            .map_err(store_err)?;

        rows.into_iter().map(Self::row_to_person).collect()
    }

    async fn create(&self, ctx: &RequestCtx, entity: &Person) -> Result<(), StoreError> {
        ctx.run(
            sqlx::query(
                r#"
INSERT INTO person (id, name, age, is_healthy)
VALUES (?, ?, ?, ?)
"#,
            )
            .bind(entity.id)
            .bind(&entity.name)
            .bind(entity.age)
            .bind(entity.is_healthy)
            .execute(&self.pool),
        )
        .await?
        .map_err(store_err)?;

        Ok(())
    }

    async fn update(&self, ctx: &RequestCtx, id: Uuid, entity: &Person) -> Result<(), StoreError> {
        let result = ctx
            .run(
                sqlx::query(
                    r#"
UPDATE person
SET name = ?, age = ?, is_healthy = ?
WHERE id = ?
"#,
                )
                .bind(&entity.name)
                .bind(entity.age)
                .bind(entity.is_healthy)
                .bind(id)
                .execute(&self.pool),
            )
            .await?
            .map_err(store_err)?;

        if result.rows_affected() == 0 && !self.exists(ctx, id).await? {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, ctx: &RequestCtx, id: Uuid) -> Result<(), StoreError> {
        let result = ctx
            .run(
                sqlx::query("DELETE FROM person WHERE id = ?")
                    .bind(id)
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

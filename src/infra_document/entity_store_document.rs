use crate::domain_model::Entity;
use crate::domain_port::*;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::marker::PhantomData;
use uuid::Uuid;

/// One JSON document per entity, keyed by id.
pub struct DocumentEntityStore<T> {
    docs: DashMap<Uuid, Value>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Entity> DocumentEntityStore<T> {
    pub fn new() -> Self {
        DocumentEntityStore {
            docs: DashMap::new(),
            _kind: PhantomData,
        }
    }

    fn decode(doc: &Value) -> Result<T, StoreError> {
        serde_json::from_value(doc.clone()).map_err(StoreError::unavailable)
    }

    fn encode(entity: &T) -> Result<Value, StoreError> {
        serde_json::to_value(entity).map_err(StoreError::unavailable)
    }
}

impl<T: Entity> Default for DocumentEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<T: Entity> EntityStore<T> for DocumentEntityStore<T> {
    async fn get(&self, ctx: &RequestCtx, id: Uuid) -> Result<Option<T>, StoreError> {
        ctx.check()?;
        self.docs.get(&id).map(|doc| Self::decode(doc.value())).transpose()
    }

    async fn list(&self, ctx: &RequestCtx) -> Result<Vec<T>, StoreError> {
        ctx.check()?;
        self.docs.iter().map(|doc| Self::decode(doc.value())).collect()
    }

    async fn create(&self, ctx: &RequestCtx, entity: &T) -> Result<(), StoreError> {
        ctx.check()?;
        let doc = Self::encode(entity)?;
        match self.docs.entry(entity.id()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "{} {} already exists",
                T::KIND,
                entity.id()
            ))),
            Entry::Vacant(e) => {
                e.insert(doc);
                Ok(())
            }
        }
    }

    async fn update(&self, ctx: &RequestCtx, id: Uuid, entity: &T) -> Result<(), StoreError> {
        ctx.check()?;
        let mut doc = Self::encode(entity)?;
        if let Value::Object(fields) = &mut doc {
            fields.insert("id".to_string(), Value::String(id.to_string()));
        }
        let mut slot = self.docs.get_mut(&id).ok_or(StoreError::NotFound)?;
        *slot = doc;
        Ok(())
    }

    async fn delete(&self, ctx: &RequestCtx, id: Uuid) -> Result<(), StoreError> {
        ctx.check()?;
        self.docs.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

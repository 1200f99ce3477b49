use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

/// A record that can be stored in a primary store and mirrored in a cache.
/// A nil id means the primary store has not assigned one yet.
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Key namespace, also used as the table/collection name.
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn set_id(&mut self, id: Uuid);
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub is_healthy: bool,
}

impl Entity for Person {
    const KIND: &'static str = "person";

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }
}

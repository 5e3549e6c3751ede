// Entity store collaborator: where workflow entities live between requests

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// An entity with a store-assigned primary key.
pub trait StoredEntity: Clone + Send + Sync + 'static {
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);
}

/// Persistence for one entity type, reachable by primary key.
#[async_trait]
pub trait EntityStore<E: StoredEntity>: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<E>>;

    /// Insert a new entity and return it with its assigned id.
    async fn add(&self, entity: E) -> Result<E>;

    /// Persist changes to an existing entity.
    async fn save(&self, entity: &E) -> Result<()>;

    async fn list(&self) -> Result<Vec<E>>;
}

#[async_trait]
impl<E, T> EntityStore<E> for Arc<T>
where
    E: StoredEntity + 'static,
    T: EntityStore<E> + ?Sized,
{
    async fn find_by_id(&self, id: i64) -> Result<Option<E>> {
        (**self).find_by_id(id).await
    }

    async fn add(&self, entity: E) -> Result<E> {
        (**self).add(entity).await
    }

    async fn save(&self, entity: &E) -> Result<()> {
        (**self).save(entity).await
    }

    async fn list(&self) -> Result<Vec<E>> {
        (**self).list().await
    }
}

/// Store backed by a map, for tools and tests.
#[derive(Debug)]
pub struct InMemoryStore<E> {
    rows: RwLock<BTreeMap<i64, E>>,
}

impl<E> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<E> InMemoryStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl<E: StoredEntity + 'static> EntityStore<E> for InMemoryStore<E> {
    async fn find_by_id(&self, id: i64) -> Result<Option<E>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn add(&self, mut entity: E) -> Result<E> {
        let mut rows = self.rows.write().await;
        let id = rows.keys().next_back().map_or(1, |last| last + 1);
        entity.set_id(id);
        rows.insert(id, entity.clone());
        debug!(id, "Entity added");
        Ok(entity)
    }

    async fn save(&self, entity: &E) -> Result<()> {
        let id = entity.id().ok_or_else(|| anyhow!("Cannot save an entity that was never added"))?;
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(row) => {
                *row = entity.clone();
                debug!(id, "Entity saved");
                Ok(())
            }
            None => Err(anyhow!("Entity {} does not exist", id)),
        }
    }

    async fn list(&self) -> Result<Vec<E>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }
}

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use wipeout_application::ObjectStore;
use wipeout_core::{AppError, AppResult};
use wipeout_domain::{StorageObject, StoragePrefix};

/// In-memory object store keyed by bucket and object name.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), i64>>,
    protected_objects: RwLock<HashSet<(String, String)>>,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes an object, bumping its generation when it already exists.
    pub async fn put_object(&self, bucket: &str, name: &str) {
        let mut objects = self.objects.write().await;
        let generation = objects
            .entry((bucket.to_owned(), name.to_owned()))
            .or_insert(0);
        *generation = generation.saturating_add(1);
    }

    /// Makes deletes of one object fail with a permission error.
    pub async fn protect_object(&self, bucket: &str, name: &str) {
        self.protected_objects
            .write()
            .await
            .insert((bucket.to_owned(), name.to_owned()));
    }

    /// Returns the object names currently stored in `bucket`.
    pub async fn object_names(&self, bucket: &str) -> Vec<String> {
        self.objects
            .read()
            .await
            .keys()
            .filter(|(stored_bucket, _)| stored_bucket == bucket)
            .map(|(_, name)| name.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn check_ready(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &StoragePrefix,
    ) -> AppResult<Vec<StorageObject>> {
        Ok(self
            .objects
            .read()
            .await
            .iter()
            .filter(|((stored_bucket, name), _)| {
                stored_bucket == bucket && name.starts_with(prefix.as_str())
            })
            .map(|((stored_bucket, name), generation)| StorageObject {
                bucket: stored_bucket.clone(),
                name: name.clone(),
                generation: Some(*generation),
            })
            .collect())
    }

    async fn delete_object(&self, object: &StorageObject) -> AppResult<()> {
        let key = (object.bucket.clone(), object.name.clone());
        if self.protected_objects.read().await.contains(&key) {
            return Err(AppError::Storage(format!(
                "permission denied deleting 'gs://{}/{}'",
                object.bucket, object.name
            )));
        }

        let mut objects = self.objects.write().await;
        match (objects.get(&key), object.generation) {
            (Some(current), Some(expected)) if *current != expected => {
                Err(AppError::Storage(format!(
                    "generation mismatch for 'gs://{}/{}': expected {expected}, found {current}",
                    object.bucket, object.name
                )))
            }
            _ => {
                objects.remove(&key);
                Ok(())
            }
        }
    }
}

use async_trait::async_trait;
use wipeout_core::AppResult;
use wipeout_domain::{StorageObject, StoragePrefix};

/// Object storage port for session audio artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Verifies the store is reachable with the configured credentials.
    async fn check_ready(&self) -> AppResult<()>;

    /// Lists every object in `bucket` whose name starts with `prefix`.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &StoragePrefix,
    ) -> AppResult<Vec<StorageObject>>;

    /// Deletes one object. Deleting an object that no longer exists succeeds.
    async fn delete_object(&self, object: &StorageObject) -> AppResult<()>;
}

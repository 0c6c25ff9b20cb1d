use async_trait::async_trait;
use uuid::Uuid;

/// Encrypted artifact storage for export bundles, keyed by bundle id.
/// The store only ever sees ciphertext; keys live on the bundle row.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, id: Uuid, bytes: Vec<u8>) -> anyhow::Result<()>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Vec<u8>>>;

    /// Remove the artifact entirely. Returns true when something was
    /// deleted; deleting an absent artifact is not an error.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

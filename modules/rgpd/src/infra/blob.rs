//! In-memory blob store for export bundle ciphertext. Production
//! deployments would back this port with object storage; the engine only
//! ever hands it sealed bytes either way.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::ports::BlobStore;

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<Uuid, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.blobs.read().contains_key(&id)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, id: Uuid, bytes: Vec<u8>) -> anyhow::Result<()> {
        self.blobs.write().insert(id, bytes);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.blobs.write().remove(&id).is_some())
    }
}

//! In-process envelope store, used when persistence is disabled.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::EnvelopeStore;
use crate::cache::Envelope;
use crate::error::StoreError;
use crate::resource::ResourceId;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<ResourceId, Envelope>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with envelopes.
    pub fn with_envelopes(envelopes: impl IntoIterator<Item = Envelope>) -> Self {
        let records = envelopes
            .into_iter()
            .map(|envelope| (envelope.resource_id().clone(), envelope))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl EnvelopeStore for MemoryStore {
    async fn load(&self, id: &ResourceId) -> Result<Option<Envelope>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn save(&self, envelope: &Envelope) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(envelope.resource_id().clone(), envelope.clone());
        Ok(())
    }
}

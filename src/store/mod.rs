//! Store Module
//!
//! Durable persistence of the latest envelope per resource. The refresh cache
//! restores from a store at startup and saves every installed envelope; the
//! in-memory envelope stays authoritative while the process runs.

mod file;
mod memory;

use async_trait::async_trait;

use crate::cache::Envelope;
use crate::error::StoreError;
use crate::resource::ResourceId;

pub use file::FileStore;
pub use memory::MemoryStore;

// == Envelope Store Trait ==
/// Backing medium for envelopes.
///
/// Implementations must make `save` atomic for readers: a concurrent `load`
/// observes either the previous record or the new one, never a partial write.
#[async_trait]
pub trait EnvelopeStore: Send + Sync {
    /// Reads the persisted envelope of a resource, if any.
    async fn load(&self, id: &ResourceId) -> Result<Option<Envelope>, StoreError>;

    /// Replaces the persisted envelope of `envelope.resource_id()`.
    async fn save(&self, envelope: &Envelope) -> Result<(), StoreError>;
}

//! Storage adapters implementing the chatwire `Store` and `AttachmentStore`
//! contracts.

pub mod memory_store;

pub use memory_store::{MemoryAttachmentStore, MemoryStore};

//! Durable checkpointing: the record format, the storage contract,
//! and a reference in-memory implementation, plus time-ordered checkpoint
//! id generation.

mod id;
mod memory_saver;
mod record;
mod saver;

pub use id::{is_canonical_checkpoint_id, CheckpointIdGenerator};
pub use memory_saver::MemorySaver;
pub use record::{CheckpointMetadata, CheckpointRecord, CheckpointSource, PendingInterrupt, PendingWrite};
pub use saver::{CheckpointTuple, ListFilter, Saver, SaverError};

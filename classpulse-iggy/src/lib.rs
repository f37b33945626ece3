//! Partitioned event log transport for classpulse.
//!
//! Events are appended to a partitioned, ordered log. The partition is chosen
//! from the event's partition key, so every event sharing a key (a quiz
//! session) lands in the same partition and is read back in append order.
//! Consumers belong to a named group and track their offsets per partition.
//!
//! # Key Types
//!
//! - [`EventLog`] - Trait for appending events and creating consumers
//! - [`EventConsumer`] - Trait for polling, marking and committing offsets
//! - [`InMemoryEventLog`] - Partitioned in-memory implementation for tests
//! - [`IggyEventLog`] - Iggy-backed implementation

pub mod config;
pub mod error;
pub mod iggy_log;
pub mod memory;
pub mod traits;

// Re-exports
pub use config::{Compression, IggyConfig};
pub use error::{Error, Result};
pub use iggy_log::IggyEventLog;
pub use memory::InMemoryEventLog;
pub use traits::{
    EventBatch, EventConsumer, EventLog, Offset, Partitionable, Position, SeekPosition,
    partition_for_key,
};

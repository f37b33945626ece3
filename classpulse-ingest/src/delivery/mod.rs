//! Ordered, at-least-once transport between ingestion and processing.
//!
//! - [`Producer`] batches envelopes onto an [`EventLog`](classpulse_iggy::EventLog),
//!   partitioned by session so one session's events stay in order.
//! - [`QueueConsumer`] reads them back within a consumer group and hands each
//!   payload to a [`Dispatcher`](crate::Dispatcher).

mod config;
mod consumer;
mod envelope;
mod producer;

pub use config::{ConsumerConfig, ProducerConfig};
pub use consumer::{ConsumerHandle, ConsumerState, ConsumerStats, QueueConsumer, ReadyLatch, spawn};
pub use envelope::{DeadLetter, EventEnvelope};
pub use producer::Producer;

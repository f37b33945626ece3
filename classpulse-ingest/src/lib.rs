//! Event ingestion for classpulse.
//!
//! Events enter as [`EventPayload`]s and take one of two paths:
//!
//! - **Direct**: [`EventProcessor`] decodes, validates (including the answer
//!   deadline check in [`TimingValidator`]) and stores the event.
//! - **Queued**: a [`Producer`] publishes the payload to a partitioned log and a
//!   [`QueueConsumer`] later feeds it through the same processor.
//!
//! [`Ingestor`] hides the choice; see [`build_ingestor`].

pub mod answer_key;
pub mod delivery;
pub mod error;
pub mod event;
pub mod ingest;
pub mod processor;
pub mod timing;

pub use answer_key::{AnswerKey, DefaultAnswerKey, PerQuestionAnswerKey};
pub use delivery::{
    ConsumerConfig, ConsumerHandle, ConsumerState, ConsumerStats, DeadLetter, EventEnvelope,
    Producer, ProducerConfig, QueueConsumer, ReadyLatch,
};
pub use error::{DeliveryError, ErrorKind, ProcessError};
pub use event::{AnswerChoice, AnswerSubmission, Event, EventPayload, EventType};
pub use ingest::{
    DirectIngestor, IngestConfig, IngestMode, IngestReceipt, Ingestor, QueuedIngestor,
    build_ingestor,
};
pub use processor::{Actor, BatchFailure, BatchReport, DispatchOutcome, Dispatcher, EventProcessor};
pub use timing::TimingValidator;

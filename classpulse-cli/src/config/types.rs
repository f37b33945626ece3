use std::path::PathBuf;

use classpulse_iggy::IggyConfig;
use classpulse_ingest::{ConsumerConfig, IngestConfig, ProducerConfig};
use serde::{Deserialize, Serialize};

/// Configuration as read from `classpulse.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClasspulseConfig {
    #[serde(default)]
    pub iggy: IggyConfig,

    #[serde(default)]
    pub producer: ProducerConfig,

    #[serde(default)]
    pub consumer: ConsumerConfig,

    #[serde(default)]
    pub dead_letter: DeadLetterConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Where the relational store lives.
///
/// A `url` selects a remote libSQL database and wins over `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Embedded database file, or `:memory:`.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Remote libSQL URL.
    pub url: Option<String>,

    /// Auth token for `url`.
    pub token: Option<String>,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("classpulse.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            url: None,
            token: None,
        }
    }
}

/// Topic that receives envelopes the consumer failed to process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeadLetterConfig {
    /// No dead-letter topic when unset; failures are only logged.
    pub topic: Option<String>,
}

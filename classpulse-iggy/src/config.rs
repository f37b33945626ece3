//! Configuration for the Iggy client.

use serde::{Deserialize, Serialize};

/// Compression applied to the topic when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Gzip,
}

/// Connection and topic settings for the Iggy-backed event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IggyConfig {
    /// TCP address of the Iggy server.
    #[serde(default = "default_address")]
    pub address: String,

    /// Stream that holds the topic.
    #[serde(default = "default_stream")]
    pub stream: String,

    /// Topic events are published to.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Number of partitions created with the topic.
    #[serde(default = "default_partitions")]
    pub partitions: u32,

    /// Compression algorithm for the topic.
    #[serde(default)]
    pub compression: Compression,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,
}

fn default_address() -> String {
    "127.0.0.1:8090".to_string()
}

fn default_stream() -> String {
    "classpulse".to_string()
}

fn default_topic() -> String {
    "quiz-events".to_string()
}

fn default_partitions() -> u32 {
    8
}

fn default_username() -> String {
    "iggy".to_string()
}

fn default_password() -> String {
    "iggy".to_string()
}

impl Default for IggyConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            stream: default_stream(),
            topic: default_topic(),
            partitions: default_partitions(),
            compression: Compression::default(),
            username: default_username(),
            password: default_password(),
        }
    }
}

impl IggyConfig {
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    #[must_use]
    pub fn with_partitions(mut self, partitions: u32) -> Self {
        self.partitions = partitions.max(1);
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = IggyConfig::default();

        assert_eq!(config.address, "127.0.0.1:8090");
        assert_eq!(config.stream, "classpulse");
        assert_eq!(config.topic, "quiz-events");
        assert_eq!(config.partitions, 8);
        assert_eq!(config.compression, Compression::Gzip);
    }

    #[test]
    fn config_builder_pattern() {
        let config = IggyConfig::default()
            .with_address("10.0.0.5:8090")
            .with_topic("replay")
            .with_partitions(0)
            .with_compression(Compression::None);

        assert_eq!(config.address, "10.0.0.5:8090");
        assert_eq!(config.topic, "replay");
        assert_eq!(config.partitions, 1);
        assert_eq!(config.compression, Compression::None);
    }

    #[test]
    fn config_fills_missing_fields_from_defaults() {
        let config: IggyConfig = toml::from_str("topic = \"events\"\npartitions = 4\n").unwrap();

        assert_eq!(config.topic, "events");
        assert_eq!(config.partitions, 4);
        assert_eq!(config.stream, "classpulse");
    }
}

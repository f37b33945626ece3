//! Producer and consumer settings.

use std::time::Duration;

use classpulse_iggy::SeekPosition;
use serde::{Deserialize, Serialize};

/// Batching and retry settings for the [`Producer`](super::Producer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Retries after the first failed send.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,

    /// Longest time a publish waits for its batch to fill.
    #[serde(default = "default_flush_interval", with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Batch size that triggers an immediate flush.
    #[serde(default = "default_flush_messages")]
    pub flush_messages: usize,
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_backoff() -> Duration {
    Duration::from_millis(100)
}

fn default_flush_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_flush_messages() -> usize {
    100
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff: default_retry_backoff(),
            flush_interval: default_flush_interval(),
            flush_messages: default_flush_messages(),
        }
    }
}

impl ProducerConfig {
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    #[must_use]
    pub fn with_flush_messages(mut self, messages: usize) -> Self {
        self.flush_messages = messages.max(1);
        self
    }
}

/// Settings for a [`QueueConsumer`](super::QueueConsumer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Consumer group; offsets are tracked per group.
    #[serde(default = "default_group")]
    pub group: String,

    /// Topics to subscribe to. One consumer runs per topic.
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,

    /// Where a group without committed offsets starts reading.
    #[serde(default = "default_start_position")]
    pub start_position: SeekPosition,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_poll_timeout", with = "humantime_serde")]
    pub poll_timeout: Duration,

    #[serde(default = "default_auto_commit_interval", with = "humantime_serde")]
    pub auto_commit_interval: Duration,

    /// Pause before rejoining after a failed join or poll.
    #[serde(default = "default_rejoin_backoff", with = "humantime_serde")]
    pub rejoin_backoff: Duration,
}

fn default_group() -> String {
    "analytics-event-processors".to_string()
}

fn default_topics() -> Vec<String> {
    vec!["quiz-events".to_string()]
}

fn default_start_position() -> SeekPosition {
    SeekPosition::Beginning
}

fn default_batch_size() -> usize {
    100
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_auto_commit_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_rejoin_backoff() -> Duration {
    Duration::from_secs(1)
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group: default_group(),
            topics: default_topics(),
            start_position: default_start_position(),
            batch_size: default_batch_size(),
            poll_timeout: default_poll_timeout(),
            auto_commit_interval: default_auto_commit_interval(),
            rejoin_backoff: default_rejoin_backoff(),
        }
    }
}

impl ConsumerConfig {
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    #[must_use]
    pub fn with_start_position(mut self, position: SeekPosition) -> Self {
        self.start_position = position;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_auto_commit_interval(mut self, interval: Duration) -> Self {
        self.auto_commit_interval = interval;
        self
    }

    #[must_use]
    pub fn with_rejoin_backoff(mut self, backoff: Duration) -> Self {
        self.rejoin_backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_defaults() {
        let config = ProducerConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.flush_interval, Duration::from_millis(100));
        assert_eq!(config.flush_messages, 100);
    }

    #[test]
    fn consumer_defaults() {
        let config = ConsumerConfig::default();
        assert_eq!(config.group, "analytics-event-processors");
        assert_eq!(config.topics, vec!["quiz-events".to_string()]);
        assert_eq!(config.start_position, SeekPosition::Beginning);
        assert_eq!(config.auto_commit_interval, Duration::from_secs(1));
    }

    #[test]
    fn durations_parse_from_humantime() {
        let config: ConsumerConfig = toml::from_str(
            "group = \"replay\"\npoll_timeout = \"250ms\"\nauto_commit_interval = \"5s\"\nstart_position = \"committed\"\n",
        )
        .unwrap();

        assert_eq!(config.group, "replay");
        assert_eq!(config.poll_timeout, Duration::from_millis(250));
        assert_eq!(config.auto_commit_interval, Duration::from_secs(5));
        assert_eq!(config.start_position, SeekPosition::Committed);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn producer_flush_messages_is_at_least_one() {
        let config = ProducerConfig::default().with_flush_messages(0);
        assert_eq!(config.flush_messages, 1);
    }
}

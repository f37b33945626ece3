//! Long-running consumer: reads queued envelopes and stores them.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use classpulse_ingest::{
    DeadLetter, Dispatcher, EventEnvelope, EventProcessor, QueueConsumer, delivery,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{connect_log, open_store, shutdown_signal};
use crate::config::ClasspulseConfig;

#[derive(Debug, Args)]
pub struct ConsumeArgs {
    /// Consumer group (overrides config)
    #[arg(short, long)]
    pub group: Option<String>,

    /// Topic to consume; repeat for several (overrides config)
    #[arg(short, long = "topic")]
    pub topics: Vec<String>,
}

pub async fn run(args: ConsumeArgs, config: ClasspulseConfig) -> Result<()> {
    let mut consumer_config = config.consumer.clone();
    if let Some(group) = args.group {
        consumer_config = consumer_config.with_group(group);
    }
    if !args.topics.is_empty() {
        consumer_config.topics = args.topics;
    }

    let store = Arc::new(open_store(&config.storage).await?);
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(EventProcessor::new(store));

    let dead_letters = match &config.dead_letter.topic {
        Some(topic) => Some(connect_log::<DeadLetter>(&config.iggy, topic).await?),
        None => None,
    };

    let shutdown = CancellationToken::new();
    let mut handles = Vec::with_capacity(consumer_config.topics.len());
    for topic in &consumer_config.topics {
        let log = connect_log::<EventEnvelope>(&config.iggy, topic).await?;
        let mut consumer = QueueConsumer::new(log, dispatcher.clone(), consumer_config.clone());
        if let Some(dead_letters) = &dead_letters {
            consumer = consumer.with_dead_letters(dead_letters.clone());
        }

        info!(topic = %topic, group = %consumer_config.group, "Starting consumer");
        handles.push((topic.clone(), delivery::spawn(Arc::new(consumer), shutdown.clone())));
    }

    shutdown_signal().await;
    info!("Shutdown requested, stopping consumers");
    shutdown.cancel();

    for (topic, handle) in handles {
        let stats = handle
            .await
            .with_context(|| format!("Consumer for {topic} panicked"))?;
        info!(
            topic = %topic,
            processed = stats.processed,
            failed = stats.failed,
            dead_lettered = stats.dead_lettered,
            rebalances = stats.rebalances,
            "Consumer stopped"
        );
    }
    Ok(())
}

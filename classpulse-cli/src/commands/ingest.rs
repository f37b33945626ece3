//! One-shot ingestion of event payloads from a file.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use classpulse_ingest::{
    Actor, Dispatcher, EventEnvelope, EventPayload, EventProcessor, IngestMode, Producer,
    build_ingestor,
};
use serde_json::Value;
use tracing::{info, warn};

use super::{connect_log, open_store, print_json};
use crate::config::ClasspulseConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Direct,
    Queued,
}

impl From<ModeArg> for IngestMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Direct => IngestMode::Direct,
            ModeArg::Queued => IngestMode::Queued,
        }
    }
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// JSON file of events: an object, an array, or one object per line. `-` reads stdin
    pub file: PathBuf,

    /// Ingest mode (overrides config)
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,
}

pub async fn run(args: IngestArgs, config: ClasspulseConfig) -> Result<()> {
    let contents = read_input(&args.file)?;
    let payloads = parse_payloads(&contents)?;
    if payloads.is_empty() {
        info!("No events to ingest");
        return Ok(());
    }

    let mut ingest_config = config.ingest.clone();
    if let Some(mode) = args.mode {
        ingest_config = ingest_config.with_mode(mode.into());
    }

    let store = Arc::new(open_store(&config.storage).await?);
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(EventProcessor::new(store));

    let producer = match ingest_config.mode {
        IngestMode::Queued => {
            let log = connect_log::<EventEnvelope>(&config.iggy, &config.iggy.topic).await?;
            Some(Arc::new(Producer::new(log, config.producer.clone())))
        }
        IngestMode::Direct => None,
    };

    let ingestor = build_ingestor(&ingest_config, dispatcher, producer.clone());
    let actor = Actor("classpulse-cli".to_string());
    let report = ingestor.ingest_batch(payloads, Some(&actor)).await;

    if let Some(producer) = producer {
        producer.close().await;
    }

    print_json(&report.succeeded)?;
    for message in report.error_messages() {
        warn!("{message}");
    }
    info!(
        total = report.total,
        processed = report.processed(),
        failed = report.failures.len(),
        mode = ?ingestor.mode(),
        "Ingest finished"
    );

    if !report.is_complete() {
        bail!("{} of {} events failed", report.failures.len(), report.total);
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut contents = String::new();
        std::io::stdin().read_to_string(&mut contents)?;
        return Ok(contents);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Accepts a single object, an array of objects, or a stream of either.
fn parse_payloads(contents: &str) -> Result<Vec<EventPayload>> {
    let mut payloads = Vec::new();
    for (index, value) in serde_json::Deserializer::from_str(contents)
        .into_iter::<Value>()
        .enumerate()
    {
        let value = value.with_context(|| format!("Invalid JSON in document {}", index + 1))?;
        match value {
            Value::Array(items) => {
                for item in items {
                    payloads.push(serde_json::from_value(item)?);
                }
            }
            other => payloads.push(serde_json::from_value(other)?),
        }
    }
    Ok(payloads)
}

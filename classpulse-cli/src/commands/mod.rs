//! Subcommand implementations and the wiring they share.

pub mod consume;
pub mod ingest;
pub mod query;
pub mod report;

use std::sync::Arc;

use anyhow::{Context, Result};
use classpulse_iggy::{EventLog, IggyConfig, IggyEventLog, Partitionable};
use classpulse_store::TursoStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::signal;
use tracing::info;

use crate::config::{ClasspulseConfig, StorageConfig};

/// Open the configured store, creating the schema if needed.
pub async fn open_store(storage: &StorageConfig) -> Result<TursoStore> {
    match (&storage.url, &storage.token) {
        (Some(url), token) => {
            let token = token.as_deref().unwrap_or_default();
            TursoStore::new_remote(url, token)
                .await
                .with_context(|| format!("Failed to connect to {url}"))
        }
        (None, _) => TursoStore::new_local(&storage.path)
            .await
            .with_context(|| format!("Failed to open {}", storage.path.display())),
    }
}

/// Connect an Iggy-backed log for `topic`, creating the stream and topic if
/// missing.
pub async fn connect_log<E>(iggy: &IggyConfig, topic: &str) -> Result<Arc<dyn EventLog<E>>>
where
    E: Serialize + DeserializeOwned + Send + Sync + Partitionable + 'static,
{
    let log = IggyEventLog::<E>::new(iggy.clone().with_topic(topic))?;
    log.connect()
        .await
        .with_context(|| format!("Failed to connect to Iggy at {}", iggy.address))?;
    Ok(Arc::new(log))
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Open the store once so every table and index exists.
pub async fn init_db(config: ClasspulseConfig) -> Result<()> {
    open_store(&config.storage).await?;
    match &config.storage.url {
        Some(url) => info!(url = %url, "Schema ready"),
        None => info!(path = %config.storage.path.display(), "Schema ready"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_db_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classpulse.db");
        let mut config = ClasspulseConfig::default();
        config.storage.path = path.clone();

        init_db(config).await.unwrap();
        assert!(path.exists());
    }
}

//! Integration tests requiring a running Iggy server.
//!
//! Run with: cargo test -p classpulse-iggy --test integration -- --ignored
//!
//! The server address defaults to 127.0.0.1:8090 and can be overridden with
//! `CLASSPULSE_IGGY_ADDRESS`.

use std::time::Duration;

use classpulse_iggy::{EventLog, IggyConfig, IggyEventLog, Partitionable, SeekPosition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct TestEvent {
    session_id: String,
    seq: u32,
}

impl Partitionable for TestEvent {
    fn partition_key(&self) -> Option<&str> {
        Some(&self.session_id)
    }
}

/// Each test gets its own topic so runs do not see each other's events.
async fn setup(topic: &str) -> IggyEventLog<TestEvent> {
    let mut config = IggyConfig::default().with_topic(format!(
        "{topic}-{}",
        std::process::id()
    ));
    if let Ok(address) = std::env::var("CLASSPULSE_IGGY_ADDRESS") {
        config = config.with_address(address);
    }

    let log = IggyEventLog::new(config).expect("Failed to build client");
    log.connect().await.expect("Failed to connect");
    log
}

#[tokio::test]
#[ignore]
async fn append_and_poll_roundtrip() {
    let log = setup("roundtrip").await;

    let event = TestEvent {
        session_id: "integration-session".to_string(),
        seq: 1,
    };
    log.append(event.clone()).await.unwrap();

    let mut consumer = log.consumer("integration-consumer").await.unwrap();
    consumer.seek(SeekPosition::Beginning).await.unwrap();

    let batch = consumer.poll(10, Duration::from_secs(2)).await.unwrap();
    assert!(batch.events.iter().any(|(_, e)| *e == event));
}

#[tokio::test]
#[ignore]
async fn events_of_one_session_are_read_in_order() {
    let log = setup("ordering").await;

    for seq in 0..10 {
        log.append(TestEvent {
            session_id: format!("session-{}", seq % 3),
            seq,
        })
        .await
        .unwrap();
    }

    let mut consumer = log.consumer("ordering-consumer").await.unwrap();
    consumer.seek(SeekPosition::Beginning).await.unwrap();
    let batch = consumer.poll(100, Duration::from_secs(2)).await.unwrap();

    for session in ["session-0", "session-1", "session-2"] {
        let seqs: Vec<u32> = batch
            .events
            .iter()
            .filter(|(_, e)| e.session_id == session)
            .map(|(_, e)| e.seq)
            .collect();
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted, "{session} delivered out of order");
    }
}

#[tokio::test]
#[ignore]
async fn committed_offsets_survive_consumer_restart() {
    let log = setup("commit").await;

    for seq in 0..4 {
        log.append(TestEvent {
            session_id: "commit-session".to_string(),
            seq,
        })
        .await
        .unwrap();
    }

    let mut consumer = log.consumer("commit-group").await.unwrap();
    let batch = consumer.poll(100, Duration::from_secs(2)).await.unwrap();
    assert_eq!(batch.len(), 4);
    let first = batch.events[0].0;
    let second = batch.events[1].0;
    consumer.mark(first);
    consumer.mark(second);
    consumer.commit().await.unwrap();
    drop(consumer);

    let mut restarted = log.consumer("commit-group").await.unwrap();
    let batch = restarted.poll(100, Duration::from_secs(2)).await.unwrap();
    let seqs: Vec<u32> = batch.events.iter().map(|(_, e)| e.seq).collect();
    assert_eq!(seqs, vec![2, 3]);
}

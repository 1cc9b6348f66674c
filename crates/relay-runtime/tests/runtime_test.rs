//! # Runtime Tests
//!
//! Drive `RelayRuntime` the way the binary does: events in on a reader,
//! records out in the configured sink.

use std::path::Path;

use relay_core::{EmptinessPolicy, Record};
use relay_runtime::{RelayConfig, RelayRuntime};

fn status_line(id: u64, name: &str, text: &str) -> String {
    serde_json::json!({
        "type": "status",
        "id": id,
        "created_at": "Thu Oct 26 10:00:00 UTC 2023",
        "user": {"id": 100 + id, "name": name},
        "text": text,
    })
    .to_string()
}

fn read_records(path: &Path) -> Vec<Record> {
    std::fs::read_to_string(path)
        .expect("sink file exists")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_events_persisted_to_json_lines_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.jsonl");

    let mut config = RelayConfig::default();
    config.sink.path = Some(path.clone());
    let runtime = RelayRuntime::new(config).unwrap();
    runtime.start().unwrap();

    let input = [
        status_line(1, "alice", "hello #python"),
        status_line(2, "bob", "off topic"),
        r#"{"type":"trade","transact_time":"20231026-10:00:00","account":"ACC-1","symbol":"IBM","side":"BUY","quantity":10,"price":"142.10"}"#.to_string(),
    ]
    .join("\n");

    let stats = runtime.ingest(input.as_bytes()).await.unwrap();
    assert_eq!(stats.published, 2);
    assert_eq!(stats.skipped, 1);

    assert_eq!(runtime.shutdown().await, 2);

    // Read straight after shutdown: every accepted record is already on disk.
    let mut records = read_records(&path);
    records.sort_by(|a, b| a.actor.cmp(&b.actor));
    assert_eq!(
        records,
        vec![
            Record::new("20231026-10:00:00", "ACC-1", "BUY 10 IBM @ 142.10"),
            Record::new("Thu Oct 26 10:00:00 UTC 2023", "alice", "hello #python"),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_empty_fields_follow_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.jsonl");

    let mut config = RelayConfig::default();
    config.sink.path = Some(path.clone());
    config.source.track.clear();
    config.validation.policy = EmptinessPolicy::AllowEmpty;
    let runtime = RelayRuntime::new(config).unwrap();
    runtime.start().unwrap();

    runtime
        .ingest(status_line(1, "", "no name").as_bytes())
        .await
        .unwrap();
    runtime.shutdown().await;

    let records = read_records(&path);
    assert_eq!(records[0].actor, "");
}

#[test]
fn test_shutdown_persists_every_accepted_record_before_runtime_exit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.jsonl");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let handled = rt.block_on(async {
        let mut config = RelayConfig::default();
        config.sink.path = Some(path.clone());
        let runtime = RelayRuntime::new(config).unwrap();
        runtime.start().unwrap();

        let input: Vec<String> = (0..200)
            .map(|i| status_line(i, &format!("user{i}"), "learning #java"))
            .collect();
        let stats = runtime.ingest(input.join("\n").as_bytes()).await.unwrap();
        assert_eq!(stats.published, 200);

        runtime.shutdown().await
    });
    // Dropping the tokio runtime cancels whatever is still spawned.
    drop(rt);

    assert_eq!(handled, 200);
    assert_eq!(read_records(&path).len(), 200);
}

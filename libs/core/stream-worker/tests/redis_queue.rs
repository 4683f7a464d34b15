//! Queue-flow tests against a live Redis instance.
//!
//! Run with: `REDIS_URL=redis://127.0.0.1:6379 cargo test -p stream-worker -- --ignored`

use redis::aio::ConnectionManager;
use std::time::{SystemTime, UNIX_EPOCH};
use stream_worker::{Reclaimer, StreamConsumer, StreamProducer, WorkerConfig};

async fn connect() -> ConnectionManager {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let client = redis::Client::open(url).expect("invalid redis url");
    ConnectionManager::new(client).await.expect("redis unavailable")
}

fn unique_config(tag: &str) -> WorkerConfig {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    WorkerConfig::new(format!("test:push:{tag}:{nonce}"), format!("group:{tag}"))
        .with_blocking_timeout_ms(100)
}

fn job_fields(token: &str) -> Vec<(String, String)> {
    vec![
        ("app_id".to_string(), "com.example.app".to_string()),
        ("token".to_string(), token.to_string()),
        ("title".to_string(), "t".to_string()),
        ("body".to_string(), "b".to_string()),
    ]
}

#[tokio::test]
#[ignore] // Requires actual Redis
async fn test_append_read_ack_round_trip() {
    let redis = connect().await;
    let config = unique_config("ack");

    let consumer = StreamConsumer::new(redis.clone(), config.clone());
    consumer.ensure_consumer_group().await.unwrap();

    let producer =
        StreamProducer::new(redis, config.stream_name.clone()).with_max_length(config.max_length);
    let entry_id = producer.append(&job_fields("tok1")).await.unwrap();

    let entries = consumer.read_group("c0", ">").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, entry_id);
    assert_eq!(entries[0].field("token"), Some("tok1"));

    consumer.ack(&entry_id).await.unwrap();
    let pending = consumer.pending(10).await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
#[ignore] // Requires actual Redis
async fn test_remove_deletes_entry_and_strips_pending() {
    let redis = connect().await;
    let config = unique_config("remove");

    let consumer = StreamConsumer::new(redis.clone(), config.clone());
    consumer.ensure_consumer_group().await.unwrap();

    let producer = StreamProducer::new(redis, config.stream_name.clone());
    let entry_id = producer.append(&job_fields("deadtok")).await.unwrap();

    let entries = consumer.read_group("c0", ">").await.unwrap();
    assert_eq!(entries.len(), 1);

    consumer.remove(&entry_id).await.unwrap();

    assert_eq!(producer.stream_length().await.unwrap(), 0);
    assert!(consumer.pending(10).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires actual Redis
async fn test_backlog_read_returns_own_pending_entries() {
    let redis = connect().await;
    let config = unique_config("backlog");

    let consumer = StreamConsumer::new(redis.clone(), config.clone());
    consumer.ensure_consumer_group().await.unwrap();

    let producer = StreamProducer::new(redis, config.stream_name.clone());
    let entry_id = producer.append(&job_fields("tok1")).await.unwrap();

    // Deliver without acking, simulating a crash before ack.
    let delivered = consumer.read_group("c0", ">").await.unwrap();
    assert_eq!(delivered.len(), 1);

    // A restarted consumer with the same name sees the entry in its backlog.
    let backlog = consumer.read_group("c0", "0-0").await.unwrap();
    assert_eq!(backlog.len(), 1);
    assert_eq!(backlog[0].id, entry_id);

    // Another consumer's backlog is empty.
    let other = consumer.read_group("c1", "0-0").await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
#[ignore] // Requires actual Redis
async fn test_reclaimer_claims_stale_entry_to_least_loaded_consumer() {
    let redis = connect().await;
    // visibility 0 makes every pending entry immediately claimable
    let config = unique_config("claim").with_visibility_timeout_ms(0);

    let consumer = StreamConsumer::new(redis.clone(), config.clone());
    consumer.ensure_consumer_group().await.unwrap();

    let producer = StreamProducer::new(redis.clone(), config.stream_name.clone());
    producer.append(&job_fields("tok1")).await.unwrap();

    // c0 takes the entry and "crashes"; c1 registers idle.
    let delivered = consumer.read_group("c0", ">").await.unwrap();
    assert_eq!(delivered.len(), 1);
    let _ = consumer.read_group("c1", ">").await.unwrap();

    let reclaimer = Reclaimer::new(redis, config);
    let summary = reclaimer.tick().await.unwrap();
    assert_eq!(summary.claimed, 1);

    let pending = consumer.pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].consumer, "c1");
    assert_eq!(pending[0].delivery_count, 2);
}

#[tokio::test]
#[ignore] // Requires actual Redis
async fn test_reclaimer_finalizes_poison_entry() {
    let redis = connect().await;
    let config = unique_config("poison")
        .with_visibility_timeout_ms(0)
        .with_reclaim_max_retry_count(1);

    let consumer = StreamConsumer::new(redis.clone(), config.clone());
    consumer.ensure_consumer_group().await.unwrap();

    let producer = StreamProducer::new(redis.clone(), config.stream_name.clone());
    producer.append(&job_fields("tok1")).await.unwrap();

    // First delivery, then one claim brings delivery_count to 2; the next
    // tick sees 2 + 1 > 1 and force-acks.
    let _ = consumer.read_group("c0", ">").await.unwrap();
    let _ = consumer.read_group("c1", ">").await.unwrap();

    let reclaimer = Reclaimer::new(redis, config);
    let first = reclaimer.tick().await.unwrap();
    assert_eq!(first.claimed + first.finalized, 1);

    // Ticks are idempotent apart from delivery counts; pending drains to 0.
    let mut drained = false;
    for _ in 0..3 {
        reclaimer.tick().await.unwrap();
        if consumer.pending(10).await.unwrap().is_empty() {
            drained = true;
            break;
        }
    }
    assert!(drained, "poison entry should be finalized within the cap");
}

#[tokio::test]
#[ignore] // Requires actual Redis
async fn test_reclaimer_strips_dangling_pending_reference() {
    let redis = connect().await;
    let config = unique_config("dangling").with_visibility_timeout_ms(0);

    let consumer = StreamConsumer::new(redis.clone(), config.clone());
    consumer.ensure_consumer_group().await.unwrap();

    let producer = StreamProducer::new(redis.clone(), config.stream_name.clone());
    let entry_id = producer.append(&job_fields("tok1")).await.unwrap();

    let _ = consumer.read_group("c0", ">").await.unwrap();
    let _ = consumer.read_group("c1", ">").await.unwrap();

    // Delete the entry body without acking, leaving a dangling pending row.
    let mut conn = consumer.manager();
    let _: i64 = redis::cmd("XDEL")
        .arg(consumer.stream_name())
        .arg(&entry_id)
        .query_async(&mut conn)
        .await
        .unwrap();

    let reclaimer = Reclaimer::new(redis, config);
    let summary = reclaimer.tick().await.unwrap();
    assert_eq!(summary.removed, 1);
    assert!(consumer.pending(10).await.unwrap().is_empty());
}

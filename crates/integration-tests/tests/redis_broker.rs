//! RedisBroker against a live server
//!
//! Skipped unless GOQ_TEST_REDIS_ADDR (host:port) points at a disposable redis.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use goq_core::port::Broker;
use goq_core::{
    processor_fn, shutdown_channel, ConnectionOptions, ErrorHandler, Job, Queue, QueueContext,
    QueueOptions, Status,
};
use goq_infra_redis::RedisBroker;
use tokio::sync::mpsc;

async fn connect() -> Option<RedisBroker> {
    let addr = match std::env::var("GOQ_TEST_REDIS_ADDR") {
        Ok(addr) => addr,
        Err(_) => {
            println!("GOQ_TEST_REDIS_ADDR not set, skipping");
            return None;
        }
    };
    let options = ConnectionOptions {
        pool_size: 2,
        max_retries: 1,
        ..ConnectionOptions::new(addr)
    };
    Some(RedisBroker::connect(&options).await.unwrap())
}

fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("goq:test:{}:{}:{}", prefix, std::process::id(), nanos)
}

#[tokio::test]
async fn test_list_and_key_operations() {
    let Some(broker) = connect().await else {
        return;
    };
    let list = unique("list");
    let key = unique("key");

    broker.push(&list, "first").await.unwrap();
    broker.push(&list, "second").await.unwrap();
    assert_eq!(broker.len(&list).await.unwrap(), 2);

    let popped = broker
        .blocking_pop(&list, Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(popped, Some((list.clone(), "first".to_string())));

    let empty = unique("empty");
    let timed_out = broker
        .blocking_pop(&empty, Some(Duration::from_millis(100)))
        .await
        .unwrap();
    assert!(timed_out.is_none());

    assert!(broker.get(&key).await.unwrap().is_none());
    broker.set(&key, "value", Some(Duration::from_secs(30))).await.unwrap();
    assert_eq!(broker.get(&key).await.unwrap().as_deref(), Some("value"));

    broker.push_front(&list, "zeroth").await.unwrap();
    let head = broker
        .blocking_pop(&list, Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(head, Some((list.clone(), "zeroth".to_string())));
}

#[tokio::test]
async fn test_status_ttl_expires_key() {
    let Some(broker) = connect().await else {
        return;
    };
    let key = unique("expiring");

    broker.set(&key, "short", Some(Duration::from_secs(1))).await.unwrap();
    assert_eq!(broker.get(&key).await.unwrap().as_deref(), Some("short"));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(broker.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_resize_scenario_on_redis() {
    let Some(broker) = connect().await else {
        return;
    };
    let context = Arc::new(QueueContext::with_broker(Arc::new(broker)));

    let (tx, mut done) = mpsc::unbounded_channel();
    let processor = processor_fn(move |mut job: Job| {
        let tx = tx.clone();
        async move {
            job.set_status(1, 100).await.unwrap();
            tx.send(job.id().to_string()).unwrap();
        }
    });
    let errors: ErrorHandler = Arc::new(|e| eprintln!("queue error: {}", e));
    let payload = format!(r#"{{"task":"resize","run":"{}"}}"#, unique("run"));
    let queue = Arc::new(Queue::new(
        context,
        QueueOptions::new(unique("queue"), processor, errors)
            .with_pop_timeout(Some(Duration::from_millis(200)))
            .with_status_ttl(Some(Duration::from_secs(60))),
    ));

    let id = queue.enqueue(&payload).await.unwrap();
    assert_eq!(queue.queue_status().await.unwrap().queue_length, 1);

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let runner = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.run(shutdown_rx).await })
    };

    let processed = tokio::time::timeout(Duration::from_secs(5), done.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(processed, id);
    assert_eq!(queue.job_status(&id).await.unwrap(), Status::new(1, 100));

    shutdown_tx.shutdown();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

//! End-to-end coverage of the submit -> queue -> worker -> result-store ->
//! retrieve path, driven entirely through the crate's public API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use taskrunner::config::Config;
use taskrunner::queue::memory::MemoryQueue;
use taskrunner::queue::Queue;
use taskrunner::retrieve;
use taskrunner::store::memory::MemoryResultStore;
use taskrunner::store::ResultStore;
use taskrunner::submit;
use taskrunner::worker::{FnHandler, HandlerRegistry, WorkerPool};

fn square_registry() -> Arc<HandlerRegistry> {
    let registry = Arc::new(HandlerRegistry::new());
    registry.register(
        "square",
        Arc::new(FnHandler::new(|payload: HashMap<String, serde_json::Value>| async move {
            let x = payload
                .get("x")
                .and_then(serde_json::Value::as_i64)
                .ok_or_else(|| "missing x".to_string())?;
            Ok(json!(x * x))
        })),
    );
    registry
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn wait_until_present(store: &Arc<dyn ResultStore>, id: &str, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if store.exists(id).await.unwrap() {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("result for {id} was not published in time");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn happy_path_submit_through_retrieve() {
    init_tracing();
    let queue: Arc<dyn Queue> = Arc::new(MemoryQueue::new());
    let store: Arc<dyn ResultStore> = Arc::new(MemoryResultStore::default());
    let registry = square_registry();

    let mut config = Config::default();
    config.api_workers = 2;
    config.poll_timeout_ms = 20;

    let pool = WorkerPool::spawn(Arc::clone(&queue), Arc::clone(&store), registry, config);

    let mut payload = HashMap::new();
    payload.insert("x".to_string(), json!(8));
    let id = submit::submit(&queue, "square".to_string(), payload).await.unwrap();

    wait_until_present(&store, &id, Duration::from_secs(2)).await;
    let task = retrieve::get(&store, &id).await.unwrap().unwrap();
    assert_eq!(task.result, Some(json!(64)));
    assert!(retrieve::exists(&store, &id).await.unwrap());

    retrieve::delete(&store, &id).await.unwrap();
    assert!(!retrieve::exists(&store, &id).await.unwrap());

    pool.shutdown(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn submit_rejects_blank_kind_before_touching_the_queue() {
    let queue: Arc<dyn Queue> = Arc::new(MemoryQueue::new());
    let err = submit::submit(&queue, String::new(), HashMap::new()).await.unwrap_err();
    assert!(matches!(err, taskrunner::TaskRunnerError::InvalidSubmission { .. }));
    assert_eq!(queue.length().await.unwrap(), 0);
}

#[tokio::test]
async fn result_ttl_expires_and_is_unreachable_via_retrieve() {
    let queue: Arc<dyn Queue> = Arc::new(MemoryQueue::new());
    let store: Arc<dyn ResultStore> = Arc::new(MemoryResultStore::new(Duration::from_millis(20)));
    let registry = square_registry();

    let mut config = Config::default();
    config.api_workers = 1;
    config.poll_timeout_ms = 10;
    config.result_store_ttl_secs = 0;

    let pool = WorkerPool::spawn(Arc::clone(&queue), Arc::clone(&store), registry, config);

    let mut payload = HashMap::new();
    payload.insert("x".to_string(), json!(3));
    let id = submit::submit(&queue, "square".to_string(), payload).await.unwrap();

    wait_until_present(&store, &id, Duration::from_secs(2)).await;

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!retrieve::exists(&store, &id).await.unwrap());
    assert!(retrieve::get(&store, &id).await.unwrap().is_none());

    pool.shutdown(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn fifo_order_is_preserved_end_to_end_with_a_single_worker() {
    let queue: Arc<dyn Queue> = Arc::new(MemoryQueue::new());
    let store: Arc<dyn ResultStore> = Arc::new(MemoryResultStore::default());
    let registry = Arc::new(HandlerRegistry::new());
    let order: Arc<std::sync::Mutex<Vec<i64>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let order_for_handler = Arc::clone(&order);
    registry.register(
        "record",
        Arc::new(FnHandler::new(move |payload: HashMap<String, serde_json::Value>| {
            let order = Arc::clone(&order_for_handler);
            async move {
                let n = payload.get("n").and_then(serde_json::Value::as_i64).unwrap_or(-1);
                order.lock().unwrap().push(n);
                Ok(json!(n))
            }
        })),
    );

    let mut config = Config::default();
    config.api_workers = 1;
    config.poll_timeout_ms = 10;

    let pool = WorkerPool::spawn(Arc::clone(&queue), Arc::clone(&store), registry, config);

    let mut ids = Vec::new();
    for n in 0..8 {
        let mut payload = HashMap::new();
        payload.insert("n".to_string(), json!(n));
        let id = submit::submit(&queue, "record".to_string(), payload).await.unwrap();
        ids.push(id);
    }

    for id in &ids {
        wait_until_present(&store, id, Duration::from_secs(2)).await;
    }
    pool.shutdown(Duration::from_millis(200)).await;

    assert_eq!(*order.lock().unwrap(), (0..8).collect::<Vec<_>>());
}

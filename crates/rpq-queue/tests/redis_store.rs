//! Script behaviour against a live Redis.
//!
//! Run with `RPQ_TEST_REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored`.

use std::sync::Arc;

use redis::aio::MultiplexedConnection;

use rpq_queue::{MemoryStore, QueueClient, QueueError, QueueStore, RedisStore, SerializerKind};

fn redis_url() -> String {
    std::env::var("RPQ_TEST_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Store plus a raw connection, with `name` cleared beforehand.
async fn fresh(name: &str) -> (RedisStore, MultiplexedConnection, String) {
    let url = redis_url();
    let store = RedisStore::connect(&url).await.unwrap();
    let client = redis::Client::open(url).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();

    let key = format!("rpq:test:{}:{}", name, std::process::id());
    let _: i64 = redis::cmd("DEL").arg(&key).query_async(&mut conn).await.unwrap();
    (store, conn, key)
}

async fn zscore(conn: &mut MultiplexedConnection, key: &str, member: &[u8]) -> Option<f64> {
    redis::cmd("ZSCORE").arg(key).arg(member).query_async(conn).await.unwrap()
}

async fn zcard(conn: &mut MultiplexedConnection, key: &str) -> i64 {
    redis::cmd("ZCARD").arg(key).query_async(conn).await.unwrap()
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_push_one_accumulates_score() {
    let (store, mut conn, key) = fresh("accumulate").await;

    assert_eq!(store.push_one(&key, 2.0, b"p").await.unwrap(), 2.0);
    assert_eq!(store.push_one(&key, 5.0, b"p").await.unwrap(), 7.0);
    assert_eq!(store.push_one(&key, 0.25, b"q").await.unwrap(), 0.25);

    assert_eq!(zscore(&mut conn, &key, b"p").await, Some(7.0));
    assert_eq!(zscore(&mut conn, &key, b"q").await, Some(0.25));
    assert_eq!(zcard(&mut conn, &key).await, 2);
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_negative_scores_are_never_popped() {
    let (store, mut conn, key) = fresh("negative").await;
    store.push_one(&key, -1.0, b"hidden").await.unwrap();

    assert_eq!(store.pop_one(&key).await.unwrap(), None);
    assert!(store.batch_pop(&key, 10).await.unwrap().is_empty());
    assert_eq!(zcard(&mut conn, &key).await, 1);

    // Raising it to zero makes it eligible.
    assert_eq!(store.push_one(&key, 1.0, b"hidden").await.unwrap(), 0.0);
    assert_eq!(store.pop_one(&key).await.unwrap(), Some(b"hidden".to_vec()));
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_batch_push_ties_pop_in_byte_order() {
    let (store, mut conn, key) = fresh("ties").await;
    let members = vec![b"c".to_vec(), b"a".to_vec(), b"b".to_vec()];

    let scores = store.batch_push(&key, 1.0, &members).await.unwrap();
    assert_eq!(scores, vec![1.0, 1.0, 1.0]);

    let popped = store.batch_pop(&key, 3).await.unwrap();
    assert_eq!(popped, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    assert_eq!(zcard(&mut conn, &key).await, 0);
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_batch_push_merges_duplicates_within_batch() {
    let (store, _conn, key) = fresh("dupes").await;
    let members = vec![b"x".to_vec(), b"x".to_vec()];

    let scores = store.batch_push(&key, 2.0, &members).await.unwrap();
    assert_eq!(scores, vec![2.0, 4.0]);
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_batch_pop_limits_and_returns_subset() {
    let (store, mut conn, key) = fresh("subset").await;
    store.push_one(&key, 3.0, b"third").await.unwrap();
    store.push_one(&key, 1.0, b"first").await.unwrap();
    store.push_one(&key, 2.0, b"second").await.unwrap();

    let popped = store.batch_pop(&key, 2).await.unwrap();
    assert_eq!(popped, vec![b"first".to_vec(), b"second".to_vec()]);
    assert_eq!(zcard(&mut conn, &key).await, 1);

    let rest = store.batch_pop(&key, 5).await.unwrap();
    assert_eq!(rest, vec![b"third".to_vec()]);
    assert!(store.batch_pop(&key, 5).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_empty_pops() {
    let (store, _conn, key) = fresh("empty").await;

    assert_eq!(store.pop_one(&key).await.unwrap(), None);
    assert!(store.batch_pop(&key, 3).await.unwrap().is_empty());

    store.push_one(&key, 1.0, b"kept").await.unwrap();
    assert!(store.batch_pop(&key, 0).await.unwrap().is_empty());
    assert_eq!(store.pop_one(&key).await.unwrap(), Some(b"kept".to_vec()));
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_redis_and_memory_stores_agree() {
    let (redis_store, _conn, key) = fresh("agree").await;
    let memory = MemoryStore::new();
    let stores: [&dyn QueueStore; 2] = [&redis_store, &memory];

    let mut results = Vec::new();
    for store in stores {
        let mut trace = Vec::new();
        trace.push(format!("{:?}", store.push_one(&key, 1.5, b"m1").await.unwrap()));
        trace.push(format!("{:?}", store.push_one(&key, -2.0, b"neg").await.unwrap()));
        let batch = vec![b"m2".to_vec(), b"m1".to_vec(), b"m0".to_vec()];
        trace.push(format!("{:?}", store.batch_push(&key, 1.5, &batch).await.unwrap()));
        trace.push(format!("{:?}", store.pop_one(&key).await.unwrap()));
        trace.push(format!("{:?}", store.batch_pop(&key, 10).await.unwrap()));
        trace.push(format!("{:?}", store.pop_one(&key).await.unwrap()));
        results.push(trace);
    }

    assert_eq!(results[0], results[1]);
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_client_over_redis() {
    let (store, _conn, key) = fresh("client").await;
    let client: QueueClient<String> = QueueClient::new(SerializerKind::Json, Arc::new(store));

    client.push_one(&"a".to_string(), 3.0, &key).await.unwrap();
    client.push_one(&"b".to_string(), 1.0, &key).await.unwrap();
    client.push_one(&"c".to_string(), 2.0, &key).await.unwrap();

    assert_eq!(client.pop_one(&key).await.unwrap(), "b");
    assert_eq!(client.batch_pop(&key, 5).await.unwrap(), vec!["c".to_string(), "a".to_string()]);
    assert!(matches!(client.pop_one(&key).await, Err(QueueError::EmptyQueue(_))));
    assert!(matches!(client.batch_pop(&key, 0).await, Err(QueueError::EmptyQueue(_))));
}

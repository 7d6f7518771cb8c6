//! Redis integration tests
//!
//! A single Redis container is shared by every test; each test uses its own
//! key prefix so they can run in parallel.
//!
//! ```bash
//! cargo test -p cache --test redis_integration
//! ```

use std::sync::Arc;
use std::time::Duration;

use cache::{CacheManager, CacheManagerExt, RedisCacheManager};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::{REDIS_PORT, Redis};
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Redis>,
    url: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Redis::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(REDIS_PORT).await.unwrap();

            Arc::new(ContainerInfo {
                container,
                url: format!("redis://{host}:{port}"),
            })
        })
        .await
        .clone()
}

async fn get_test_cache(prefix: &str) -> RedisCacheManager {
    let info = get_container_info().await;
    RedisCacheManager::connect(&info.url)
        .await
        .unwrap()
        .with_prefix(prefix)
}

async fn raw_exists(url: &str, key: &str) -> bool {
    let client = redis::Client::open(url).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    redis::cmd("EXISTS")
        .arg(key)
        .query_async::<bool>(&mut conn)
        .await
        .unwrap()
}

#[tokio::test]
async fn ping_succeeds() {
    let cache = get_test_cache("ping_").await;
    cache.ping().await.unwrap();
}

#[tokio::test]
async fn typed_values_round_trip() {
    let cache = get_test_cache("typed_").await;
    cache
        .set("numbers", &vec![1, 2, 3], Some(Duration::from_secs(60)))
        .await
        .unwrap();

    let value: Option<Vec<u8>> = cache.get("numbers").await.unwrap();
    assert_eq!(value, Some(vec![1, 2, 3]));

    let missing: Option<Vec<u8>> = cache.get("absent").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn keys_are_prefixed() {
    let info = get_container_info().await;
    let cache = get_test_cache("prefixed_").await;
    cache.set_raw("k", "v".to_string(), None).await.unwrap();

    assert!(raw_exists(&info.url, "prefixed_k").await);
    assert!(!raw_exists(&info.url, "k").await);
}

#[tokio::test]
async fn remove_key_deletes_entry() {
    let cache = get_test_cache("remove_").await;
    cache.set_raw("k", "v".to_string(), None).await.unwrap();
    cache.remove_key("k").await.unwrap();
    assert!(cache.get_raw("k").await.unwrap().is_none());
}

#[tokio::test]
async fn ttl_expires_entries() {
    let cache = get_test_cache("ttl_").await;
    cache
        .set_raw("k", "v".to_string(), Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert!(cache.get_raw("k").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(cache.get_raw("k").await.unwrap().is_none());
}

#[tokio::test]
async fn invalidate_tag_removes_members_and_tag_set() {
    let info = get_container_info().await;
    let cache = get_test_cache("tags_").await;

    for key in ["page1", "page2", "untagged"] {
        cache.set_raw(key, "x".to_string(), None).await.unwrap();
    }
    cache.tag_key("page1", "Lists").await.unwrap();
    cache.tag_key("page2", "Lists").await.unwrap();
    assert!(raw_exists(&info.url, "tags_Lists").await);

    cache.invalidate_tag("Lists").await.unwrap();

    assert!(cache.get_raw("page1").await.unwrap().is_none());
    assert!(cache.get_raw("page2").await.unwrap().is_none());
    assert!(cache.get_raw("untagged").await.unwrap().is_some());
    assert!(!raw_exists(&info.url, "tags_Lists").await);
}

#[tokio::test]
async fn invalidate_unknown_tag_is_a_no_op() {
    let cache = get_test_cache("empty_").await;
    cache.invalidate_tag("never-used").await.unwrap();
}

#[tokio::test]
async fn keys_tagged_during_invalidation_stay_tracked() {
    let info = get_container_info().await;
    let cache = get_test_cache("race_").await;

    let mut tasks = Vec::new();
    for round in 0..20 {
        let writer = cache.clone();
        tasks.push(tokio::spawn(async move {
            let key = format!("page{round}");
            writer.set_raw(&key, "x".to_string(), None).await.unwrap();
            writer.tag_key(&key, "Lists").await.unwrap();
        }));
        let invalidator = cache.clone();
        tasks.push(tokio::spawn(async move {
            invalidator.invalidate_tag("Lists").await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let client = redis::Client::open(info.url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let members: Vec<String> = redis::cmd("SMEMBERS")
        .arg("race_Lists")
        .query_async(&mut conn)
        .await
        .unwrap();
    for round in 0..20 {
        let key = format!("page{round}");
        if cache.get_raw(&key).await.unwrap().is_some() {
            assert!(members.contains(&key), "{key} is cached but untagged");
        }
    }
}

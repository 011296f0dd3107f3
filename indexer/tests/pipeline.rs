//! End-to-end pipeline tests against the in-memory source and store.

use std::time::Duration;

use indexer::concurrency::retry::RetryPolicy;
use indexer::pipeline::IndexerPipeline;
use indexer::source::MemoryEventSource;
use indexer::store::{CheckpointStore, MaterializeStore, MemoryStore};
use indexer::test_utils::{
    content_published_payload, position, profile_created_payload, profile_updated_payload,
    subscription_purchased_payload, tier_created_payload,
};
use indexer::trackers::TrackerSettings;
use indexer::types::EventType;

fn fast_settings() -> TrackerSettings {
    TrackerSettings {
        poll_interval: Duration::from_millis(10),
        page_size: 10,
        retry_policy: RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        },
    }
}

fn pipeline(
    source: &MemoryEventSource,
    store: &MemoryStore,
) -> IndexerPipeline<MemoryEventSource, MemoryStore> {
    IndexerPipeline::new(source.clone(), store.clone(), fast_settings())
}

/// Long enough for several poll ticks and a full retry budget.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn materializes_a_multi_type_backlog() {
    let source = MemoryEventSource::new();
    let store = MemoryStore::new();

    source
        .push_event(
            EventType::ProfileCreated,
            position(1),
            profile_created_payload("0xa", "p-1", "alice"),
        )
        .await;
    source
        .push_event(
            EventType::TierCreated,
            position(1),
            tier_created_payload("t-1", "0xa", "gold", "1000"),
        )
        .await;
    source
        .push_event(
            EventType::SubscriptionPurchased,
            position(1),
            subscription_purchased_payload("s-1", "t-1", "0xb"),
        )
        .await;
    source
        .push_event(
            EventType::ContentPublished,
            position(1),
            content_published_payload("c-1", "0xa", "post", true, &["t-1"]),
        )
        .await;

    let mut pipeline = pipeline(&source, &store);
    pipeline.start().unwrap();
    settle().await;
    pipeline.shutdown_and_wait().await.unwrap();

    assert!(store.get_creator("0xa").await.unwrap().is_some());
    assert!(store.get_tier("t-1").await.unwrap().is_some());
    assert!(store.get_subscription("s-1").await.unwrap().is_some());
    assert!(store.get_content("c-1").await.unwrap().is_some());
    let junctions = store.get_content_tiers("c-1").await.unwrap();
    assert_eq!(junctions.len(), 1);

    // The subscription purchase notified the tier's creator.
    let notifications = store.get_notifications("0xa").await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, "new_subscriber");
}

#[tokio::test]
async fn tier_arriving_before_its_creator_converges() {
    let source = MemoryEventSource::new();
    let store = MemoryStore::new();

    // The tier log is ahead of the profile log.
    source
        .push_event(
            EventType::TierCreated,
            position(1),
            tier_created_payload("t-1", "0xa", "gold", "1000"),
        )
        .await;

    // A generous retry budget so the late creator always lands inside it.
    let settings = TrackerSettings {
        retry_policy: RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        },
        ..fast_settings()
    };
    let mut pipeline = IndexerPipeline::new(source.clone(), store.clone(), settings);
    pipeline.start().unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    source
        .push_event(
            EventType::ProfileCreated,
            position(1),
            profile_created_payload("0xa", "p-1", "alice"),
        )
        .await;

    settle().await;
    pipeline.shutdown_and_wait().await.unwrap();

    let tier = store.get_tier("t-1").await.unwrap().unwrap();
    assert_eq!(tier.creator_address, "0xa");
}

#[tokio::test]
async fn event_with_absent_dependency_is_skipped_and_log_continues() {
    let source = MemoryEventSource::new();
    let store = MemoryStore::new();

    source
        .push_event(
            EventType::ProfileCreated,
            position(1),
            profile_created_payload("0xa", "p-1", "alice"),
        )
        .await;
    // References a creator that never appears on any log.
    source
        .push_event(
            EventType::TierCreated,
            position(1),
            tier_created_payload("t-orphan", "0xdead", "ghost", "1000"),
        )
        .await;
    source
        .push_event(
            EventType::TierCreated,
            position(2),
            tier_created_payload("t-1", "0xa", "gold", "1000"),
        )
        .await;

    let mut pipeline = pipeline(&source, &store);
    pipeline.start().unwrap();
    settle().await;
    pipeline.shutdown_and_wait().await.unwrap();

    // The orphan was dropped after its retry budget, the log kept moving.
    assert!(store.get_tier("t-orphan").await.unwrap().is_none());
    assert!(store.get_tier("t-1").await.unwrap().is_some());
    let checkpoint = store
        .get_checkpoint(EventType::TierCreated)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.sequence, 2);
}

#[tokio::test]
async fn profile_update_without_profile_is_skipped_and_checkpoint_advances() {
    let source = MemoryEventSource::new();
    let store = MemoryStore::new();

    source
        .push_event(
            EventType::ProfileUpdated,
            position(1),
            profile_updated_payload("p-ghost", "nobody", None),
        )
        .await;

    let mut pipeline = pipeline(&source, &store);
    pipeline.start().unwrap();
    settle().await;
    pipeline.shutdown_and_wait().await.unwrap();

    assert!(store.get_creator_by_profile("p-ghost").await.unwrap().is_none());
    let checkpoint = store
        .get_checkpoint(EventType::ProfileUpdated)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.sequence, 1);
}

#[tokio::test]
async fn content_with_missing_tier_writes_nothing() {
    let source = MemoryEventSource::new();
    let store = MemoryStore::new();

    source
        .push_event(
            EventType::ProfileCreated,
            position(1),
            profile_created_payload("0xa", "p-1", "alice"),
        )
        .await;
    source
        .push_event(
            EventType::ContentPublished,
            position(1),
            content_published_payload("c-1", "0xa", "gated", true, &["t-missing"]),
        )
        .await;
    source
        .push_event(
            EventType::ContentPublished,
            position(2),
            content_published_payload("c-2", "0xa", "public", false, &[]),
        )
        .await;

    let mut pipeline = pipeline(&source, &store);
    pipeline.start().unwrap();
    settle().await;
    pipeline.shutdown_and_wait().await.unwrap();

    // Neither the content row nor any junction row of the failed write exists.
    assert!(store.get_content("c-1").await.unwrap().is_none());
    assert!(store.get_content_tiers("c-1").await.unwrap().is_empty());
    assert!(store.get_content("c-2").await.unwrap().is_some());
}

#[tokio::test]
async fn replaying_a_processed_log_is_idempotent() {
    let source = MemoryEventSource::new();
    let store = MemoryStore::new();

    source
        .push_event(
            EventType::ProfileCreated,
            position(1),
            profile_created_payload("0xa", "p-1", "alice"),
        )
        .await;
    source
        .push_event(
            EventType::TierCreated,
            position(1),
            tier_created_payload("t-1", "0xa", "gold", "1000"),
        )
        .await;

    let mut first = pipeline(&source, &store);
    first.start().unwrap();
    settle().await;
    first.shutdown_and_wait().await.unwrap();

    // A fresh store replays the whole log; the shared store resumes from its
    // checkpoint. Both end up in the same state.
    let replayed_store = MemoryStore::new();
    let mut replay = pipeline(&source, &replayed_store);
    replay.start().unwrap();
    settle().await;
    replay.shutdown_and_wait().await.unwrap();

    assert_eq!(
        store.get_creator("0xa").await.unwrap(),
        replayed_store.get_creator("0xa").await.unwrap()
    );
    assert_eq!(
        store.get_tier("t-1").await.unwrap(),
        replayed_store.get_tier("t-1").await.unwrap()
    );
}

#[tokio::test]
async fn redelivered_events_below_the_checkpoint_change_nothing() {
    let source = MemoryEventSource::new();
    let store = MemoryStore::new();

    source
        .push_event(
            EventType::ProfileCreated,
            position(1),
            profile_created_payload("0xa", "p-1", "alice"),
        )
        .await;
    source
        .push_event(
            EventType::ProfileCreated,
            position(2),
            profile_created_payload("0xb", "p-2", "bob"),
        )
        .await;

    let mut first = pipeline(&source, &store);
    first.start().unwrap();
    settle().await;
    first.shutdown_and_wait().await.unwrap();

    let alice_before = store.get_creator("0xa").await.unwrap().unwrap();
    let bob_before = store.get_creator("0xb").await.unwrap().unwrap();

    // Wind the checkpoint back so the next fetch re-delivers both events, as
    // an overlapping page from the source would.
    store
        .set_checkpoint(EventType::ProfileCreated, position(0))
        .await
        .unwrap();

    let mut second = pipeline(&source, &store);
    second.start().unwrap();
    settle().await;
    second.shutdown_and_wait().await.unwrap();

    assert_eq!(store.get_creator("0xa").await.unwrap().unwrap(), alice_before);
    assert_eq!(store.get_creator("0xb").await.unwrap().unwrap(), bob_before);
    let checkpoint = store
        .get_checkpoint(EventType::ProfileCreated)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.sequence, 2);
}

#[tokio::test]
async fn resumes_from_persisted_checkpoints_after_restart() {
    let source = MemoryEventSource::new();
    let store = MemoryStore::new();

    source
        .push_event(
            EventType::ProfileCreated,
            position(1),
            profile_created_payload("0xa", "p-1", "alice"),
        )
        .await;

    let mut first = pipeline(&source, &store);
    first.start().unwrap();
    settle().await;
    first.shutdown_and_wait().await.unwrap();

    source
        .push_event(
            EventType::ProfileCreated,
            position(2),
            profile_created_payload("0xb", "p-2", "bob"),
        )
        .await;

    let mut second = pipeline(&source, &store);
    second.start().unwrap();
    settle().await;
    second.shutdown_and_wait().await.unwrap();

    assert!(store.get_creator("0xa").await.unwrap().is_some());
    assert!(store.get_creator("0xb").await.unwrap().is_some());
    let checkpoint = store
        .get_checkpoint(EventType::ProfileCreated)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.sequence, 2);
}

#[tokio::test]
async fn idle_pipeline_shuts_down_promptly() {
    let source = MemoryEventSource::new();
    let store = MemoryStore::new();

    let mut pipeline = pipeline(&source, &store);
    pipeline.start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_secs(1), pipeline.shutdown_and_wait())
        .await
        .expect("shutdown timed out")
        .unwrap();
}

#[tokio::test]
async fn starting_twice_is_rejected() {
    let source = MemoryEventSource::new();
    let store = MemoryStore::new();

    let mut pipeline = pipeline(&source, &store);
    pipeline.start().unwrap();
    assert!(pipeline.start().is_err());

    pipeline.shutdown_and_wait().await.unwrap();
}

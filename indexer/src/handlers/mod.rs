//! Event handlers materializing decoded ledger events into the store.
//!
//! Dispatch is a single exhaustive match over [`LedgerEvent`], so adding an
//! event kind forces a handler at compile time. Every handler is idempotent;
//! re-applying an event converges to the same store state.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::warn;

use crate::error::{ErrorKind, IndexerResult};
use crate::indexer_error;
use crate::store::MaterializeStore;
use crate::types::{
    ContentPublishedPayload, ContentRow, CreatorRow, LedgerEvent, NotificationRow,
    ProfileCreatedPayload, ProfileUpdatedPayload, SubscriptionPurchasedPayload, SubscriptionRow,
    TierCreatedPayload, TierDeactivatedPayload, TierPriceUpdatedPayload, TierRow,
};

/// Notification kind recorded when a subscription is purchased.
const NEW_SUBSCRIBER_NOTIFICATION: &str = "new_subscriber";

/// Applies a decoded event to the materialized view.
///
/// Errors of kind [`ErrorKind::DependencyNotFound`] mean a row this event
/// references has not been materialized yet and the event can be retried;
/// every other error is permanent for this event.
pub async fn apply_event<S>(store: &S, event: &LedgerEvent) -> IndexerResult<()>
where
    S: MaterializeStore,
{
    match event {
        LedgerEvent::ProfileCreated(payload) => handle_profile_created(store, payload).await,
        LedgerEvent::ProfileUpdated(payload) => handle_profile_updated(store, payload).await,
        LedgerEvent::TierCreated(payload) => handle_tier_created(store, payload).await,
        LedgerEvent::TierPriceUpdated(payload) => handle_tier_price_updated(store, payload).await,
        LedgerEvent::TierDeactivated(payload) => handle_tier_deactivated(store, payload).await,
        LedgerEvent::SubscriptionPurchased(payload) => {
            handle_subscription_purchased(store, payload).await
        }
        LedgerEvent::ContentPublished(payload) => handle_content_published(store, payload).await,
    }
}

async fn handle_profile_created<S>(store: &S, payload: &ProfileCreatedPayload) -> IndexerResult<()>
where
    S: MaterializeStore,
{
    store
        .upsert_creator(CreatorRow {
            address: payload.creator_address.clone(),
            profile_id: payload.profile_id.clone(),
            name: payload.name.clone(),
            bio: payload.bio.clone(),
        })
        .await
}

async fn handle_profile_updated<S>(store: &S, payload: &ProfileUpdatedPayload) -> IndexerResult<()>
where
    S: MaterializeStore,
{
    store
        .update_creator_profile(&payload.profile_id, payload.name.clone(), payload.bio.clone())
        .await
}

async fn handle_tier_created<S>(store: &S, payload: &TierCreatedPayload) -> IndexerResult<()>
where
    S: MaterializeStore,
{
    store
        .upsert_tier(TierRow {
            tier_id: payload.tier_id.clone(),
            creator_address: payload.creator_address.clone(),
            name: payload.name.clone(),
            price: parse_price(&payload.price)?,
            active: true,
        })
        .await
}

async fn handle_tier_price_updated<S>(
    store: &S,
    payload: &TierPriceUpdatedPayload,
) -> IndexerResult<()>
where
    S: MaterializeStore,
{
    store
        .update_tier_price(&payload.tier_id, parse_price(&payload.price)?)
        .await
}

async fn handle_tier_deactivated<S>(
    store: &S,
    payload: &TierDeactivatedPayload,
) -> IndexerResult<()>
where
    S: MaterializeStore,
{
    store.set_tier_active(&payload.tier_id, false).await
}

async fn handle_subscription_purchased<S>(
    store: &S,
    payload: &SubscriptionPurchasedPayload,
) -> IndexerResult<()>
where
    S: MaterializeStore,
{
    store
        .upsert_subscription(SubscriptionRow {
            subscription_id: payload.subscription_id.clone(),
            tier_id: payload.tier_id.clone(),
            subscriber_address: payload.subscriber_address.clone(),
            started_at: timestamp_from_ms(payload.started_at_ms)?,
            expires_at: timestamp_from_ms(payload.expires_at_ms)?,
            active: true,
        })
        .await?;

    // Notifying the tier's creator is best-effort: the subscription row is
    // already committed and must not be rolled back or retried because the
    // notification write failed.
    if let Err(error) = notify_new_subscriber(store, payload).await {
        warn!(
            subscription_id = %payload.subscription_id,
            tier_id = %payload.tier_id,
            %error,
            "failed to record new subscriber notification"
        );
    }

    Ok(())
}

async fn notify_new_subscriber<S>(
    store: &S,
    payload: &SubscriptionPurchasedPayload,
) -> IndexerResult<()>
where
    S: MaterializeStore,
{
    // The tier was just validated by the subscription upsert, so a miss here
    // only happens on a concurrent delete and is safe to swallow upstream.
    let Some(tier) = store.get_tier(&payload.tier_id).await? else {
        return Ok(());
    };

    store
        .insert_notification(NotificationRow {
            recipient_address: tier.creator_address,
            kind: NEW_SUBSCRIBER_NOTIFICATION.to_owned(),
            payload: json!({
                "subscription_id": payload.subscription_id,
                "tier_id": payload.tier_id,
                "subscriber_address": payload.subscriber_address,
            }),
        })
        .await
}

async fn handle_content_published<S>(
    store: &S,
    payload: &ContentPublishedPayload,
) -> IndexerResult<()>
where
    S: MaterializeStore,
{
    store
        .replace_content(
            ContentRow {
                content_id: payload.content_id.clone(),
                creator_address: payload.creator_address.clone(),
                title: payload.title.clone(),
                published: true,
                premium: payload.premium,
                like_count: 0,
                comment_count: 0,
            },
            &payload.tier_ids,
        )
        .await
}

fn parse_price(price: &str) -> IndexerResult<BigDecimal> {
    BigDecimal::from_str(price).map_err(|error| {
        indexer_error!(
            ErrorKind::ConversionError,
            "Tier price is not a valid decimal string",
            price.to_owned(),
            source: error
        )
    })
}

fn timestamp_from_ms(millis: i64) -> IndexerResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        indexer_error!(
            ErrorKind::ConversionError,
            "Timestamp in milliseconds is out of the representable range",
            millis
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{EventType, LedgerEvent};
    use serde_json::json;

    async fn apply(store: &MemoryStore, event_type: EventType, payload: serde_json::Value) {
        let event = LedgerEvent::decode(event_type, payload).unwrap();
        apply_event(store, &event).await.unwrap();
    }

    async fn seed_creator_and_tier(store: &MemoryStore) {
        apply(
            store,
            EventType::ProfileCreated,
            json!({
                "creator_address": "0xa",
                "profile_id": "p-1",
                "name": "alice",
            }),
        )
        .await;
        apply(
            store,
            EventType::TierCreated,
            json!({
                "tier_id": "t-1",
                "creator_address": "0xa",
                "name": "gold",
                "price": "1000",
            }),
        )
        .await;
    }

    #[tokio::test]
    async fn profile_lifecycle_materializes_creator() {
        let store = MemoryStore::new();

        apply(
            &store,
            EventType::ProfileCreated,
            json!({
                "creator_address": "0xa",
                "profile_id": "p-1",
                "name": "alice",
                "bio": "hi",
            }),
        )
        .await;
        apply(
            &store,
            EventType::ProfileUpdated,
            json!({
                "profile_id": "p-1",
                "name": "alice v2",
            }),
        )
        .await;

        let creator = store.get_creator("0xa").await.unwrap().unwrap();
        assert_eq!(creator.name, "alice v2");
        assert_eq!(creator.bio, None);
    }

    #[tokio::test]
    async fn tier_events_update_price_and_activity() {
        let store = MemoryStore::new();
        seed_creator_and_tier(&store).await;

        apply(
            &store,
            EventType::TierPriceUpdated,
            json!({ "tier_id": "t-1", "price": "2500" }),
        )
        .await;
        apply(
            &store,
            EventType::TierDeactivated,
            json!({ "tier_id": "t-1" }),
        )
        .await;

        let tier = store.get_tier("t-1").await.unwrap().unwrap();
        assert_eq!(tier.price, BigDecimal::from(2500));
        assert!(!tier.active);
    }

    #[tokio::test]
    async fn invalid_price_is_a_permanent_conversion_error() {
        let store = MemoryStore::new();
        seed_creator_and_tier(&store).await;

        let event = LedgerEvent::decode(
            EventType::TierPriceUpdated,
            json!({ "tier_id": "t-1", "price": "not-a-number" }),
        )
        .unwrap();

        let error = apply_event(&store, &event).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ConversionError);
    }

    #[tokio::test]
    async fn subscription_purchase_notifies_the_creator() {
        let store = MemoryStore::new();
        seed_creator_and_tier(&store).await;

        apply(
            &store,
            EventType::SubscriptionPurchased,
            json!({
                "subscription_id": "s-1",
                "tier_id": "t-1",
                "subscriber_address": "0xb",
                "started_at_ms": 1_700_000_000_000_i64,
                "expires_at_ms": 1_702_592_000_000_i64,
            }),
        )
        .await;

        let subscription = store.get_subscription("s-1").await.unwrap().unwrap();
        assert!(subscription.active);
        assert_eq!(subscription.subscriber_address, "0xb");

        let notifications = store.get_notifications("0xa").await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, "new_subscriber");
        assert_eq!(notifications[0].payload["subscriber_address"], "0xb");
    }

    #[tokio::test]
    async fn failing_notification_does_not_fail_the_purchase() {
        let store = MemoryStore::new();
        seed_creator_and_tier(&store).await;
        store.set_notifications_failing(true).await;

        apply(
            &store,
            EventType::SubscriptionPurchased,
            json!({
                "subscription_id": "s-1",
                "tier_id": "t-1",
                "subscriber_address": "0xb",
                "started_at_ms": 1_700_000_000_000_i64,
                "expires_at_ms": 1_702_592_000_000_i64,
            }),
        )
        .await;

        assert!(store.get_subscription("s-1").await.unwrap().is_some());
        assert!(store.get_notifications("0xa").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn republishing_content_replaces_tier_gating() {
        let store = MemoryStore::new();
        seed_creator_and_tier(&store).await;
        apply(
            &store,
            EventType::TierCreated,
            json!({
                "tier_id": "t-2",
                "creator_address": "0xa",
                "name": "silver",
                "price": "500",
            }),
        )
        .await;

        apply(
            &store,
            EventType::ContentPublished,
            json!({
                "content_id": "c-1",
                "creator_address": "0xa",
                "title": "post",
                "premium": true,
                "tier_ids": ["t-1", "t-2"],
            }),
        )
        .await;
        apply(
            &store,
            EventType::ContentPublished,
            json!({
                "content_id": "c-1",
                "creator_address": "0xa",
                "title": "post",
                "premium": true,
                "tier_ids": ["t-2"],
            }),
        )
        .await;

        let junctions = store.get_content_tiers("c-1").await.unwrap();
        assert_eq!(junctions.len(), 1);
        assert_eq!(junctions[0].tier_id, "t-2");
    }

    #[tokio::test]
    async fn events_with_missing_dependencies_are_retryable() {
        let store = MemoryStore::new();

        let event = LedgerEvent::decode(
            EventType::TierCreated,
            json!({
                "tier_id": "t-1",
                "creator_address": "0xa",
                "name": "gold",
                "price": "1000",
            }),
        )
        .unwrap();

        let error = apply_event(&store, &event).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DependencyNotFound);
    }
}

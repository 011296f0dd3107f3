//! In-memory store used by tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use tokio::sync::Mutex;

use crate::error::{ErrorKind, IndexerResult};
use crate::{bail, indexer_error};
use crate::store::base::{CheckpointStore, MaterializeStore};
use crate::types::{
    ContentRow, ContentTierRow, CreatorRow, EventPosition, EventType, NotificationRow,
    SubscriptionRow, TierRow,
};

#[derive(Debug, Default)]
struct Inner {
    checkpoints: HashMap<EventType, EventPosition>,
    creators: HashMap<String, CreatorRow>,
    tiers: HashMap<String, TierRow>,
    contents: HashMap<String, ContentRow>,
    content_tiers: Vec<ContentTierRow>,
    subscriptions: HashMap<String, SubscriptionRow>,
    notifications: Vec<NotificationRow>,
    notifications_failing: bool,
}

/// Store keeping the checkpoints and the materialized view in memory.
///
/// Mirrors the dependency and atomicity semantics of the Postgres store so
/// handler and tracker tests run against the same contract.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent [`MaterializeStore::insert_notification`] call
    /// fail, to exercise the best-effort side effect path.
    pub async fn set_notifications_failing(&self, failing: bool) {
        self.inner.lock().await.notifications_failing = failing;
    }
}

impl CheckpointStore for MemoryStore {
    async fn get_checkpoint(&self, event_type: EventType) -> IndexerResult<Option<EventPosition>> {
        let inner = self.inner.lock().await;
        Ok(inner.checkpoints.get(&event_type).cloned())
    }

    async fn set_checkpoint(
        &self,
        event_type: EventType,
        position: EventPosition,
    ) -> IndexerResult<()> {
        let mut inner = self.inner.lock().await;
        inner.checkpoints.insert(event_type, position);
        Ok(())
    }
}

impl MaterializeStore for MemoryStore {
    async fn upsert_creator(&self, creator: CreatorRow) -> IndexerResult<()> {
        let mut inner = self.inner.lock().await;

        let profile_taken = inner.creators.values().any(|existing| {
            existing.profile_id == creator.profile_id && existing.address != creator.address
        });
        if profile_taken {
            bail!(
                ErrorKind::ValidationError,
                "Profile id is already bound to another creator",
                creator.profile_id
            );
        }

        inner.creators.insert(creator.address.clone(), creator);
        Ok(())
    }

    async fn update_creator_profile(
        &self,
        profile_id: &str,
        name: String,
        bio: Option<String>,
    ) -> IndexerResult<()> {
        let mut inner = self.inner.lock().await;

        let creator = inner
            .creators
            .values_mut()
            .find(|creator| creator.profile_id == profile_id)
            .ok_or_else(|| {
                indexer_error!(
                    ErrorKind::DependencyNotFound,
                    "No creator owns the referenced profile",
                    profile_id.to_owned()
                )
            })?;

        creator.name = name;
        creator.bio = bio;

        Ok(())
    }

    async fn upsert_tier(&self, tier: TierRow) -> IndexerResult<()> {
        let mut inner = self.inner.lock().await;

        if !inner.creators.contains_key(&tier.creator_address) {
            bail!(
                ErrorKind::DependencyNotFound,
                "Tier references a creator that is not materialized yet",
                tier.creator_address
            );
        }

        inner.tiers.insert(tier.tier_id.clone(), tier);
        Ok(())
    }

    async fn update_tier_price(&self, tier_id: &str, price: BigDecimal) -> IndexerResult<()> {
        let mut inner = self.inner.lock().await;

        let tier = inner.tiers.get_mut(tier_id).ok_or_else(|| {
            indexer_error!(
                ErrorKind::DependencyNotFound,
                "Price update references a tier that is not materialized yet",
                tier_id.to_owned()
            )
        })?;

        tier.price = price;
        Ok(())
    }

    async fn set_tier_active(&self, tier_id: &str, active: bool) -> IndexerResult<()> {
        let mut inner = self.inner.lock().await;

        let tier = inner.tiers.get_mut(tier_id).ok_or_else(|| {
            indexer_error!(
                ErrorKind::DependencyNotFound,
                "Activation change references a tier that is not materialized yet",
                tier_id.to_owned()
            )
        })?;

        tier.active = active;
        Ok(())
    }

    async fn upsert_subscription(&self, subscription: SubscriptionRow) -> IndexerResult<()> {
        let mut inner = self.inner.lock().await;

        if !inner.tiers.contains_key(&subscription.tier_id) {
            bail!(
                ErrorKind::DependencyNotFound,
                "Subscription references a tier that is not materialized yet",
                subscription.tier_id
            );
        }

        inner
            .subscriptions
            .insert(subscription.subscription_id.clone(), subscription);
        Ok(())
    }

    async fn replace_content(&self, content: ContentRow, tier_ids: &[String]) -> IndexerResult<()> {
        let mut inner = self.inner.lock().await;

        // All dependency checks happen before the first write so a failure
        // leaves both the content table and the junction table untouched.
        if !inner.creators.contains_key(&content.creator_address) {
            bail!(
                ErrorKind::DependencyNotFound,
                "Content references a creator that is not materialized yet",
                content.creator_address
            );
        }
        for tier_id in tier_ids {
            if !inner.tiers.contains_key(tier_id) {
                bail!(
                    ErrorKind::DependencyNotFound,
                    "Content gating references a tier that is not materialized yet",
                    tier_id.clone()
                );
            }
        }

        let content_id = content.content_id.clone();
        match inner.contents.get_mut(&content_id) {
            Some(existing) => {
                // Engagement counters are owned by collaborators and survive
                // replays of the publication event.
                existing.creator_address = content.creator_address;
                existing.title = content.title;
                existing.published = content.published;
                existing.premium = content.premium;
            }
            None => {
                inner.contents.insert(content_id.clone(), content);
            }
        }

        inner
            .content_tiers
            .retain(|junction| junction.content_id != content_id);
        for tier_id in tier_ids {
            inner.content_tiers.push(ContentTierRow {
                content_id: content_id.clone(),
                tier_id: tier_id.clone(),
            });
        }

        Ok(())
    }

    async fn insert_notification(&self, notification: NotificationRow) -> IndexerResult<()> {
        let mut inner = self.inner.lock().await;

        if inner.notifications_failing {
            bail!(
                ErrorKind::StoreQueryFailed,
                "Notification writes are failing"
            );
        }

        inner.notifications.push(notification);
        Ok(())
    }

    async fn get_creator(&self, address: &str) -> IndexerResult<Option<CreatorRow>> {
        let inner = self.inner.lock().await;
        Ok(inner.creators.get(address).cloned())
    }

    async fn get_creator_by_profile(&self, profile_id: &str) -> IndexerResult<Option<CreatorRow>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .creators
            .values()
            .find(|creator| creator.profile_id == profile_id)
            .cloned())
    }

    async fn get_tier(&self, tier_id: &str) -> IndexerResult<Option<TierRow>> {
        let inner = self.inner.lock().await;
        Ok(inner.tiers.get(tier_id).cloned())
    }

    async fn get_content(&self, content_id: &str) -> IndexerResult<Option<ContentRow>> {
        let inner = self.inner.lock().await;
        Ok(inner.contents.get(content_id).cloned())
    }

    async fn get_content_tiers(&self, content_id: &str) -> IndexerResult<Vec<ContentTierRow>> {
        let inner = self.inner.lock().await;

        let mut junctions: Vec<ContentTierRow> = inner
            .content_tiers
            .iter()
            .filter(|junction| junction.content_id == content_id)
            .cloned()
            .collect();
        junctions.sort_by(|a, b| a.tier_id.cmp(&b.tier_id));

        Ok(junctions)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> IndexerResult<Option<SubscriptionRow>> {
        let inner = self.inner.lock().await;
        Ok(inner.subscriptions.get(subscription_id).cloned())
    }

    async fn get_notifications(
        &self,
        recipient_address: &str,
    ) -> IndexerResult<Vec<NotificationRow>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .notifications
            .iter()
            .filter(|notification| notification.recipient_address == recipient_address)
            .cloned()
            .collect())
    }
}

use std::future::Future;

use bigdecimal::BigDecimal;

use crate::error::IndexerResult;
use crate::types::{
    ContentRow, ContentTierRow, CreatorRow, EventPosition, EventType, NotificationRow,
    SubscriptionRow, TierRow,
};

/// Trait for persisting per-event-type resume positions.
///
/// A tracker loads its checkpoint once at startup and writes it back after
/// every processed page. Checkpoints are independent across event types.
pub trait CheckpointStore {
    /// Returns the last persisted position for `event_type`, if any.
    fn get_checkpoint(
        &self,
        event_type: EventType,
    ) -> impl Future<Output = IndexerResult<Option<EventPosition>>> + Send;

    /// Persists `position` as the resume point for `event_type`.
    fn set_checkpoint(
        &self,
        event_type: EventType,
        position: EventPosition,
    ) -> impl Future<Output = IndexerResult<()>> + Send;
}

/// Trait for the relational view the handlers materialize events into.
///
/// All write operations are idempotent: replaying an already-applied event
/// converges to the same row state. Operations that reference another entity
/// fail with [`crate::error::ErrorKind::DependencyNotFound`] when that entity
/// has not been materialized yet, which is the only error class callers
/// retry.
pub trait MaterializeStore {
    /// Inserts a creator, or overwrites its profile fields if the address is
    /// already known.
    fn upsert_creator(&self, creator: CreatorRow)
    -> impl Future<Output = IndexerResult<()>> + Send;

    /// Updates the profile fields of the creator owning `profile_id`.
    ///
    /// Fails with `DependencyNotFound` when no creator carries that profile.
    fn update_creator_profile(
        &self,
        profile_id: &str,
        name: String,
        bio: Option<String>,
    ) -> impl Future<Output = IndexerResult<()>> + Send;

    /// Inserts or overwrites a tier. The owning creator must already exist.
    fn upsert_tier(&self, tier: TierRow) -> impl Future<Output = IndexerResult<()>> + Send;

    /// Sets the price of an existing tier.
    fn update_tier_price(
        &self,
        tier_id: &str,
        price: BigDecimal,
    ) -> impl Future<Output = IndexerResult<()>> + Send;

    /// Flips the active flag of an existing tier.
    fn set_tier_active(
        &self,
        tier_id: &str,
        active: bool,
    ) -> impl Future<Output = IndexerResult<()>> + Send;

    /// Inserts or overwrites a subscription. The tier it grants access to
    /// must already exist.
    fn upsert_subscription(
        &self,
        subscription: SubscriptionRow,
    ) -> impl Future<Output = IndexerResult<()>> + Send;

    /// Writes a content row together with its tier gating, atomically.
    ///
    /// The content upsert and the full replacement of its tier associations
    /// succeed or fail as a unit. Engagement counters of an existing row are
    /// preserved across replays. The owning creator and every referenced tier
    /// must exist, otherwise nothing is written.
    fn replace_content(
        &self,
        content: ContentRow,
        tier_ids: &[String],
    ) -> impl Future<Output = IndexerResult<()>> + Send;

    /// Records a notification for later delivery.
    ///
    /// Callers treat this as best-effort: a failure here is logged, never
    /// propagated into event handling.
    fn insert_notification(
        &self,
        notification: NotificationRow,
    ) -> impl Future<Output = IndexerResult<()>> + Send;

    fn get_creator(
        &self,
        address: &str,
    ) -> impl Future<Output = IndexerResult<Option<CreatorRow>>> + Send;

    fn get_creator_by_profile(
        &self,
        profile_id: &str,
    ) -> impl Future<Output = IndexerResult<Option<CreatorRow>>> + Send;

    fn get_tier(&self, tier_id: &str)
    -> impl Future<Output = IndexerResult<Option<TierRow>>> + Send;

    fn get_content(
        &self,
        content_id: &str,
    ) -> impl Future<Output = IndexerResult<Option<ContentRow>>> + Send;

    /// Returns the tier associations of a content row, ordered by tier id.
    fn get_content_tiers(
        &self,
        content_id: &str,
    ) -> impl Future<Output = IndexerResult<Vec<ContentTierRow>>> + Send;

    fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> impl Future<Output = IndexerResult<Option<SubscriptionRow>>> + Send;

    /// Returns all notifications recorded for `recipient_address`, in
    /// insertion order.
    fn get_notifications(
        &self,
        recipient_address: &str,
    ) -> impl Future<Output = IndexerResult<Vec<NotificationRow>>> + Send;
}

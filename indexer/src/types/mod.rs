//! Core types shared across the ingestion pipeline.

mod event;
mod rows;

pub use event::{
    ContentPublishedPayload, LedgerEvent, ProfileCreatedPayload, ProfileUpdatedPayload,
    SubscriptionPurchasedPayload, TierCreatedPayload, TierDeactivatedPayload,
    TierPriceUpdatedPayload,
};
pub use rows::{
    ContentRow, ContentTierRow, CreatorRow, NotificationRow, SubscriptionRow, TierRow,
};

use std::cmp::Ordering;
use std::fmt;

/// A named category of ledger-emitted event.
///
/// Each event type has its own independent checkpoint and ordering; adding a
/// variant here is a compile-time-checked change because every dispatch over
/// events is an exhaustive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    ProfileCreated,
    ProfileUpdated,
    TierCreated,
    TierPriceUpdated,
    TierDeactivated,
    SubscriptionPurchased,
    ContentPublished,
}

impl EventType {
    /// All event types the pipeline tracks, one tracker each.
    pub const ALL: [EventType; 7] = [
        EventType::ProfileCreated,
        EventType::ProfileUpdated,
        EventType::TierCreated,
        EventType::TierPriceUpdated,
        EventType::TierDeactivated,
        EventType::SubscriptionPurchased,
        EventType::ContentPublished,
    ];

    /// Returns the wire name of the event type, used as the checkpoint key
    /// and in the source query filter.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ProfileCreated => "profile_created",
            EventType::ProfileUpdated => "profile_updated",
            EventType::TierCreated => "tier_created",
            EventType::TierPriceUpdated => "tier_price_updated",
            EventType::TierDeactivated => "tier_deactivated",
            EventType::SubscriptionPurchased => "subscription_purchased",
            EventType::ContentPublished => "content_published",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in one event type's log.
///
/// Combines the monotonic sequence number assigned by the ledger with the
/// digest of the transaction that emitted the event. Ordering is by sequence
/// number only; the digest disambiguates positions for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPosition {
    /// Monotonically increasing sequence number within the event type's log.
    pub sequence: u64,
    /// Digest of the originating ledger transaction.
    pub tx_digest: String,
}

impl EventPosition {
    pub fn new(sequence: u64, tx_digest: impl Into<String>) -> Self {
        Self {
            sequence,
            tx_digest: tx_digest.into(),
        }
    }
}

impl PartialOrd for EventPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

impl fmt::Display for EventPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.sequence, self.tx_digest)
    }
}

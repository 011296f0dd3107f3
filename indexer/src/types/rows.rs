//! Row types of the materialized relational view.
//!
//! Every row keyed by an on-chain identifier is written with an idempotent
//! upsert: applying the same event twice converges to the same row state.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

/// A creator of the platform, keyed by ledger address.
///
/// The on-chain profile identifier is a secondary unique key used by profile
/// update events, which do not carry the address.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatorRow {
    pub address: String,
    pub profile_id: String,
    pub name: String,
    pub bio: Option<String>,
}

/// A subscription tier owned by a creator, keyed by on-chain tier id.
///
/// The price is an arbitrary-precision integer in the smallest currency unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TierRow {
    pub tier_id: String,
    pub creator_address: String,
    pub name: String,
    pub price: BigDecimal,
    pub active: bool,
}

/// A piece of published content, keyed by on-chain content id.
///
/// Carries publication flags and denormalized engagement counters. The
/// counters are initialized to zero on first materialization and maintained
/// by collaborators outside this pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRow {
    pub content_id: String,
    pub creator_address: String,
    pub title: String,
    pub published: bool,
    pub premium: bool,
    pub like_count: i64,
    pub comment_count: i64,
}

/// Junction row between a content and a tier gating access to it.
///
/// Uniquely keyed by the pair. The full set for a content is replaced, never
/// diffed, on every re-processing of its publication event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTierRow {
    pub content_id: String,
    pub tier_id: String,
}

/// A purchased subscription, keyed by on-chain subscription id.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRow {
    pub subscription_id: String,
    pub tier_id: String,
    pub subscriber_address: String,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
}

/// An in-app notification generated as a best-effort side effect.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRow {
    pub recipient_address: String,
    pub kind: String,
    pub payload: serde_json::Value,
}

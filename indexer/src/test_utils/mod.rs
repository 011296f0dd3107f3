//! Helpers shared by unit and integration tests.
//!
//! Compiled only for tests or with the `test-utils` feature enabled.

use serde_json::{Value, json};

use crate::types::EventPosition;

/// Builds an event position with a digest derived from the sequence.
pub fn position(sequence: u64) -> EventPosition {
    EventPosition::new(sequence, format!("tx-{sequence}"))
}

pub fn profile_created_payload(creator_address: &str, profile_id: &str, name: &str) -> Value {
    json!({
        "creator_address": creator_address,
        "profile_id": profile_id,
        "name": name,
    })
}

pub fn profile_updated_payload(profile_id: &str, name: &str, bio: Option<&str>) -> Value {
    json!({
        "profile_id": profile_id,
        "name": name,
        "bio": bio,
    })
}

pub fn tier_created_payload(
    tier_id: &str,
    creator_address: &str,
    name: &str,
    price: &str,
) -> Value {
    json!({
        "tier_id": tier_id,
        "creator_address": creator_address,
        "name": name,
        "price": price,
    })
}

pub fn tier_price_updated_payload(tier_id: &str, price: &str) -> Value {
    json!({
        "tier_id": tier_id,
        "price": price,
    })
}

pub fn tier_deactivated_payload(tier_id: &str) -> Value {
    json!({ "tier_id": tier_id })
}

pub fn subscription_purchased_payload(
    subscription_id: &str,
    tier_id: &str,
    subscriber_address: &str,
) -> Value {
    json!({
        "subscription_id": subscription_id,
        "tier_id": tier_id,
        "subscriber_address": subscriber_address,
        "started_at_ms": 1_700_000_000_000_i64,
        "expires_at_ms": 1_702_592_000_000_i64,
    })
}

pub fn content_published_payload(
    content_id: &str,
    creator_address: &str,
    title: &str,
    premium: bool,
    tier_ids: &[&str],
) -> Value {
    json!({
        "content_id": content_id,
        "creator_address": creator_address,
        "title": title,
        "premium": premium,
        "tier_ids": tier_ids,
    })
}

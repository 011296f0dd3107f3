//! Decoded ledger events and their typed payloads.

use serde::Deserialize;

use crate::error::IndexerResult;
use crate::types::EventType;

/// Payload of a `profile_created` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileCreatedPayload {
    /// Ledger address of the creator's account.
    pub creator_address: String,
    /// On-chain identifier of the profile object.
    pub profile_id: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Payload of a `profile_updated` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdatedPayload {
    /// On-chain identifier of the profile object being updated.
    pub profile_id: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Payload of a `tier_created` event.
///
/// The price travels as a decimal string in the smallest currency unit to
/// avoid precision loss in JSON numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct TierCreatedPayload {
    /// On-chain identifier of the tier object.
    pub tier_id: String,
    /// Ledger address of the owning creator.
    pub creator_address: String,
    pub name: String,
    pub price: String,
}

/// Payload of a `tier_price_updated` event.
#[derive(Debug, Clone, Deserialize)]
pub struct TierPriceUpdatedPayload {
    pub tier_id: String,
    pub price: String,
}

/// Payload of a `tier_deactivated` event.
#[derive(Debug, Clone, Deserialize)]
pub struct TierDeactivatedPayload {
    pub tier_id: String,
}

/// Payload of a `subscription_purchased` event.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPurchasedPayload {
    /// On-chain identifier of the subscription object.
    pub subscription_id: String,
    /// On-chain identifier of the purchased tier.
    pub tier_id: String,
    /// Ledger address of the subscriber.
    pub subscriber_address: String,
    /// Start of the validity window, in milliseconds since the Unix epoch.
    pub started_at_ms: i64,
    /// End of the validity window, in milliseconds since the Unix epoch.
    pub expires_at_ms: i64,
}

/// Payload of a `content_published` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentPublishedPayload {
    /// On-chain identifier of the content object.
    pub content_id: String,
    /// Ledger address of the publishing creator.
    pub creator_address: String,
    pub title: String,
    /// Whether the content is gated behind one or more tiers.
    pub premium: bool,
    /// Tier ids gating access to the content. Empty for public content.
    #[serde(default)]
    pub tier_ids: Vec<String>,
}

/// A decoded ledger event.
///
/// The closed set of event kinds the pipeline materializes. Every dispatch
/// over this enum is an exhaustive match, so a new event kind cannot be added
/// without the compiler pointing at every place that must handle it.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    ProfileCreated(ProfileCreatedPayload),
    ProfileUpdated(ProfileUpdatedPayload),
    TierCreated(TierCreatedPayload),
    TierPriceUpdated(TierPriceUpdatedPayload),
    TierDeactivated(TierDeactivatedPayload),
    SubscriptionPurchased(SubscriptionPurchasedPayload),
    ContentPublished(ContentPublishedPayload),
}

impl LedgerEvent {
    /// Decodes the raw JSON payload of an event of the given type.
    ///
    /// Fails with [`crate::error::ErrorKind::DeserializationError`] when the
    /// payload does not match the event type's schema; that failure is
    /// permanent, never retried.
    pub fn decode(event_type: EventType, payload: serde_json::Value) -> IndexerResult<LedgerEvent> {
        let event = match event_type {
            EventType::ProfileCreated => {
                LedgerEvent::ProfileCreated(serde_json::from_value(payload)?)
            }
            EventType::ProfileUpdated => {
                LedgerEvent::ProfileUpdated(serde_json::from_value(payload)?)
            }
            EventType::TierCreated => LedgerEvent::TierCreated(serde_json::from_value(payload)?),
            EventType::TierPriceUpdated => {
                LedgerEvent::TierPriceUpdated(serde_json::from_value(payload)?)
            }
            EventType::TierDeactivated => {
                LedgerEvent::TierDeactivated(serde_json::from_value(payload)?)
            }
            EventType::SubscriptionPurchased => {
                LedgerEvent::SubscriptionPurchased(serde_json::from_value(payload)?)
            }
            EventType::ContentPublished => {
                LedgerEvent::ContentPublished(serde_json::from_value(payload)?)
            }
        };

        Ok(event)
    }

    /// Returns the event type of this event.
    pub fn event_type(&self) -> EventType {
        match self {
            LedgerEvent::ProfileCreated(_) => EventType::ProfileCreated,
            LedgerEvent::ProfileUpdated(_) => EventType::ProfileUpdated,
            LedgerEvent::TierCreated(_) => EventType::TierCreated,
            LedgerEvent::TierPriceUpdated(_) => EventType::TierPriceUpdated,
            LedgerEvent::TierDeactivated(_) => EventType::TierDeactivated,
            LedgerEvent::SubscriptionPurchased(_) => EventType::SubscriptionPurchased,
            LedgerEvent::ContentPublished(_) => EventType::ContentPublished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_profile_created() {
        let payload = json!({
            "creator_address": "0xabc",
            "profile_id": "profile-1",
            "name": "alice",
            "bio": "hello"
        });

        let event = LedgerEvent::decode(EventType::ProfileCreated, payload).unwrap();

        let LedgerEvent::ProfileCreated(payload) = event else {
            panic!("expected a profile created event");
        };
        assert_eq!(payload.creator_address, "0xabc");
        assert_eq!(payload.profile_id, "profile-1");
        assert_eq!(payload.bio.as_deref(), Some("hello"));
    }

    #[test]
    fn decodes_content_published_without_tiers() {
        let payload = json!({
            "content_id": "content-1",
            "creator_address": "0xabc",
            "title": "first post",
            "premium": false
        });

        let event = LedgerEvent::decode(EventType::ContentPublished, payload).unwrap();

        let LedgerEvent::ContentPublished(payload) = event else {
            panic!("expected a content published event");
        };
        assert!(payload.tier_ids.is_empty());
    }

    #[test]
    fn mismatched_payload_fails_decoding() {
        let payload = json!({ "tier_id": "tier-1" });

        let result = LedgerEvent::decode(EventType::ProfileCreated, payload);

        assert_eq!(
            result.unwrap_err().kind(),
            crate::error::ErrorKind::DeserializationError
        );
    }
}

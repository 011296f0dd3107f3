//! Postgres-backed store for checkpoints and the materialized view.
//!
//! Schema management lives outside this crate; the store expects the
//! following tables to exist:
//!
//! ```sql
//! create table creators (
//!     address text primary key,
//!     profile_id text not null unique,
//!     name text not null,
//!     bio text
//! );
//! create table tiers (
//!     tier_id text primary key,
//!     creator_address text not null references creators (address) on delete cascade,
//!     name text not null,
//!     price numeric not null,
//!     active boolean not null
//! );
//! create table contents (
//!     content_id text primary key,
//!     creator_address text not null references creators (address) on delete cascade,
//!     title text not null,
//!     published boolean not null,
//!     premium boolean not null,
//!     like_count bigint not null default 0,
//!     comment_count bigint not null default 0
//! );
//! create table content_tiers (
//!     content_id text not null references contents (content_id) on delete cascade,
//!     tier_id text not null references tiers (tier_id) on delete cascade,
//!     primary key (content_id, tier_id)
//! );
//! create table subscriptions (
//!     subscription_id text primary key,
//!     tier_id text not null references tiers (tier_id) on delete cascade,
//!     subscriber_address text not null,
//!     started_at timestamptz not null,
//!     expires_at timestamptz not null,
//!     active boolean not null
//! );
//! create table notifications (
//!     id bigserial primary key,
//!     recipient_address text not null,
//!     kind text not null,
//!     payload jsonb not null,
//!     created_at timestamptz not null default now()
//! );
//! create table ingest_checkpoints (
//!     event_type text primary key,
//!     last_sequence bigint not null,
//!     last_tx_digest text not null,
//!     updated_at timestamptz not null default now()
//! );
//! ```

use std::collections::HashSet;

use bigdecimal::BigDecimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use indexer_config::shared::PgConnectionConfig;

use crate::error::{ErrorKind, IndexerResult};
use crate::store::base::{CheckpointStore, MaterializeStore};
use crate::types::{
    ContentRow, ContentTierRow, CreatorRow, EventPosition, EventType, NotificationRow,
    SubscriptionRow, TierRow,
};
use crate::{bail, indexer_error};

/// One connection per tracker plus headroom for the binary's own queries.
const NUM_POOL_CONNECTIONS: u32 = 8;

/// Store writing checkpoints and materialized rows into Postgres.
///
/// Cheap to clone; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects to the database described by `config`.
    pub async fn connect(config: &PgConnectionConfig) -> IndexerResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(NUM_POOL_CONNECTIONS)
            .connect_with(config.with_db())
            .await?;

        Ok(Self { pool })
    }

    /// Wraps an already-connected pool, used by tests that manage their own
    /// database lifecycle.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Event sequences are stored as `bigint`; the ledger guarantees they fit.
fn sequence_to_db(sequence: u64) -> IndexerResult<i64> {
    i64::try_from(sequence).map_err(|_| {
        indexer_error!(
            ErrorKind::ConversionError,
            "Event sequence number does not fit into a signed 64-bit column",
            sequence
        )
    })
}

fn creator_from_row(row: &PgRow) -> IndexerResult<CreatorRow> {
    Ok(CreatorRow {
        address: row.try_get("address")?,
        profile_id: row.try_get("profile_id")?,
        name: row.try_get("name")?,
        bio: row.try_get("bio")?,
    })
}

fn tier_from_row(row: &PgRow) -> IndexerResult<TierRow> {
    Ok(TierRow {
        tier_id: row.try_get("tier_id")?,
        creator_address: row.try_get("creator_address")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        active: row.try_get("active")?,
    })
}

fn content_from_row(row: &PgRow) -> IndexerResult<ContentRow> {
    Ok(ContentRow {
        content_id: row.try_get("content_id")?,
        creator_address: row.try_get("creator_address")?,
        title: row.try_get("title")?,
        published: row.try_get("published")?,
        premium: row.try_get("premium")?,
        like_count: row.try_get("like_count")?,
        comment_count: row.try_get("comment_count")?,
    })
}

fn subscription_from_row(row: &PgRow) -> IndexerResult<SubscriptionRow> {
    Ok(SubscriptionRow {
        subscription_id: row.try_get("subscription_id")?,
        tier_id: row.try_get("tier_id")?,
        subscriber_address: row.try_get("subscriber_address")?,
        started_at: row.try_get("started_at")?,
        expires_at: row.try_get("expires_at")?,
        active: row.try_get("active")?,
    })
}

impl CheckpointStore for PostgresStore {
    async fn get_checkpoint(&self, event_type: EventType) -> IndexerResult<Option<EventPosition>> {
        let row = sqlx::query(
            "select last_sequence, last_tx_digest from ingest_checkpoints where event_type = $1",
        )
        .bind(event_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sequence: i64 = row.try_get("last_sequence")?;
        let tx_digest: String = row.try_get("last_tx_digest")?;

        Ok(Some(EventPosition::new(sequence as u64, tx_digest)))
    }

    async fn set_checkpoint(
        &self,
        event_type: EventType,
        position: EventPosition,
    ) -> IndexerResult<()> {
        sqlx::query(
            r#"
            insert into ingest_checkpoints (event_type, last_sequence, last_tx_digest, updated_at)
            values ($1, $2, $3, now())
            on conflict (event_type)
            do update set last_sequence = excluded.last_sequence,
                          last_tx_digest = excluded.last_tx_digest,
                          updated_at = now()
            "#,
        )
        .bind(event_type.as_str())
        .bind(sequence_to_db(position.sequence)?)
        .bind(&position.tx_digest)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl MaterializeStore for PostgresStore {
    async fn upsert_creator(&self, creator: CreatorRow) -> IndexerResult<()> {
        sqlx::query(
            r#"
            insert into creators (address, profile_id, name, bio)
            values ($1, $2, $3, $4)
            on conflict (address)
            do update set profile_id = excluded.profile_id,
                          name = excluded.name,
                          bio = excluded.bio
            "#,
        )
        .bind(&creator.address)
        .bind(&creator.profile_id)
        .bind(&creator.name)
        .bind(&creator.bio)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_creator_profile(
        &self,
        profile_id: &str,
        name: String,
        bio: Option<String>,
    ) -> IndexerResult<()> {
        let result = sqlx::query("update creators set name = $2, bio = $3 where profile_id = $1")
            .bind(profile_id)
            .bind(&name)
            .bind(&bio)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            bail!(
                ErrorKind::DependencyNotFound,
                "No creator owns the referenced profile",
                profile_id.to_owned()
            );
        }

        Ok(())
    }

    async fn upsert_tier(&self, tier: TierRow) -> IndexerResult<()> {
        let creator_exists: bool =
            sqlx::query_scalar("select exists (select 1 from creators where address = $1)")
                .bind(&tier.creator_address)
                .fetch_one(&self.pool)
                .await?;
        if !creator_exists {
            bail!(
                ErrorKind::DependencyNotFound,
                "Tier references a creator that is not materialized yet",
                tier.creator_address
            );
        }

        sqlx::query(
            r#"
            insert into tiers (tier_id, creator_address, name, price, active)
            values ($1, $2, $3, $4, $5)
            on conflict (tier_id)
            do update set creator_address = excluded.creator_address,
                          name = excluded.name,
                          price = excluded.price,
                          active = excluded.active
            "#,
        )
        .bind(&tier.tier_id)
        .bind(&tier.creator_address)
        .bind(&tier.name)
        .bind(&tier.price)
        .bind(tier.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_tier_price(&self, tier_id: &str, price: BigDecimal) -> IndexerResult<()> {
        let result = sqlx::query("update tiers set price = $2 where tier_id = $1")
            .bind(tier_id)
            .bind(&price)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            bail!(
                ErrorKind::DependencyNotFound,
                "Price update references a tier that is not materialized yet",
                tier_id.to_owned()
            );
        }

        Ok(())
    }

    async fn set_tier_active(&self, tier_id: &str, active: bool) -> IndexerResult<()> {
        let result = sqlx::query("update tiers set active = $2 where tier_id = $1")
            .bind(tier_id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            bail!(
                ErrorKind::DependencyNotFound,
                "Activation change references a tier that is not materialized yet",
                tier_id.to_owned()
            );
        }

        Ok(())
    }

    async fn upsert_subscription(&self, subscription: SubscriptionRow) -> IndexerResult<()> {
        let tier_exists: bool =
            sqlx::query_scalar("select exists (select 1 from tiers where tier_id = $1)")
                .bind(&subscription.tier_id)
                .fetch_one(&self.pool)
                .await?;
        if !tier_exists {
            bail!(
                ErrorKind::DependencyNotFound,
                "Subscription references a tier that is not materialized yet",
                subscription.tier_id
            );
        }

        sqlx::query(
            r#"
            insert into subscriptions
                (subscription_id, tier_id, subscriber_address, started_at, expires_at, active)
            values ($1, $2, $3, $4, $5, $6)
            on conflict (subscription_id)
            do update set tier_id = excluded.tier_id,
                          subscriber_address = excluded.subscriber_address,
                          started_at = excluded.started_at,
                          expires_at = excluded.expires_at,
                          active = excluded.active
            "#,
        )
        .bind(&subscription.subscription_id)
        .bind(&subscription.tier_id)
        .bind(&subscription.subscriber_address)
        .bind(subscription.started_at)
        .bind(subscription.expires_at)
        .bind(subscription.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replace_content(&self, content: ContentRow, tier_ids: &[String]) -> IndexerResult<()> {
        let mut tx = self.pool.begin().await?;

        // Dependency checks run inside the transaction; bailing out before
        // commit rolls back and leaves both tables untouched.
        let creator_exists: bool =
            sqlx::query_scalar("select exists (select 1 from creators where address = $1)")
                .bind(&content.creator_address)
                .fetch_one(&mut *tx)
                .await?;
        if !creator_exists {
            bail!(
                ErrorKind::DependencyNotFound,
                "Content references a creator that is not materialized yet",
                content.creator_address
            );
        }

        let known_tiers: Vec<String> =
            sqlx::query_scalar("select tier_id from tiers where tier_id = any($1)")
                .bind(tier_ids)
                .fetch_all(&mut *tx)
                .await?;
        let known_tiers: HashSet<&str> = known_tiers.iter().map(String::as_str).collect();
        if let Some(missing) = tier_ids
            .iter()
            .find(|tier_id| !known_tiers.contains(tier_id.as_str()))
        {
            bail!(
                ErrorKind::DependencyNotFound,
                "Content gating references a tier that is not materialized yet",
                missing.clone()
            );
        }

        // Engagement counters are owned by collaborators; the upsert leaves
        // them alone on conflict.
        sqlx::query(
            r#"
            insert into contents
                (content_id, creator_address, title, published, premium, like_count, comment_count)
            values ($1, $2, $3, $4, $5, $6, $7)
            on conflict (content_id)
            do update set creator_address = excluded.creator_address,
                          title = excluded.title,
                          published = excluded.published,
                          premium = excluded.premium
            "#,
        )
        .bind(&content.content_id)
        .bind(&content.creator_address)
        .bind(&content.title)
        .bind(content.published)
        .bind(content.premium)
        .bind(content.like_count)
        .bind(content.comment_count)
        .execute(&mut *tx)
        .await?;

        sqlx::query("delete from content_tiers where content_id = $1")
            .bind(&content.content_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            insert into content_tiers (content_id, tier_id)
            select $1, tier_id from unnest($2::text[]) as tier_id
            "#,
        )
        .bind(&content.content_id)
        .bind(tier_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn insert_notification(&self, notification: NotificationRow) -> IndexerResult<()> {
        sqlx::query("insert into notifications (recipient_address, kind, payload) values ($1, $2, $3)")
            .bind(&notification.recipient_address)
            .bind(&notification.kind)
            .bind(&notification.payload)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_creator(&self, address: &str) -> IndexerResult<Option<CreatorRow>> {
        let row =
            sqlx::query("select address, profile_id, name, bio from creators where address = $1")
                .bind(address)
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(creator_from_row).transpose()
    }

    async fn get_creator_by_profile(&self, profile_id: &str) -> IndexerResult<Option<CreatorRow>> {
        let row = sqlx::query(
            "select address, profile_id, name, bio from creators where profile_id = $1",
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(creator_from_row).transpose()
    }

    async fn get_tier(&self, tier_id: &str) -> IndexerResult<Option<TierRow>> {
        let row = sqlx::query(
            "select tier_id, creator_address, name, price, active from tiers where tier_id = $1",
        )
        .bind(tier_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(tier_from_row).transpose()
    }

    async fn get_content(&self, content_id: &str) -> IndexerResult<Option<ContentRow>> {
        let row = sqlx::query(
            r#"
            select content_id, creator_address, title, published, premium, like_count, comment_count
            from contents where content_id = $1
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(content_from_row).transpose()
    }

    async fn get_content_tiers(&self, content_id: &str) -> IndexerResult<Vec<ContentTierRow>> {
        let rows = sqlx::query(
            "select content_id, tier_id from content_tiers where content_id = $1 order by tier_id",
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ContentTierRow {
                    content_id: row.try_get("content_id")?,
                    tier_id: row.try_get("tier_id")?,
                })
            })
            .collect()
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> IndexerResult<Option<SubscriptionRow>> {
        let row = sqlx::query(
            r#"
            select subscription_id, tier_id, subscriber_address, started_at, expires_at, active
            from subscriptions where subscription_id = $1
            "#,
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(subscription_from_row).transpose()
    }

    async fn get_notifications(
        &self,
        recipient_address: &str,
    ) -> IndexerResult<Vec<NotificationRow>> {
        let rows = sqlx::query(
            r#"
            select recipient_address, kind, payload
            from notifications where recipient_address = $1 order by id
            "#,
        )
        .bind(recipient_address)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(NotificationRow {
                    recipient_address: row.try_get("recipient_address")?,
                    kind: row.try_get("kind")?,
                    payload: row.try_get("payload")?,
                })
            })
            .collect()
    }
}

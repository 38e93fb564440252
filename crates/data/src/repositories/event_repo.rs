//! Tracking event repository.
//!
//! Events are append-only; the aggregation path only reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use splitflow_core::{EngineError, EventStore, NewEvent, VariantAggregate, CONVERSION_EVENTS};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::VariantAggregateRow;
use crate::repositories::store_err;

/// Identifier and timestamp of a stored event.
#[derive(Debug, Clone)]
pub struct EventReceipt {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Repository for tracking event operations.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a single tracking event.
    ///
    /// # Errors
    /// Returns `EngineError::Store` if the insert fails.
    pub async fn insert(&self, event: &NewEvent) -> Result<EventReceipt, EngineError> {
        let (id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r"
            INSERT INTO events (visitor_id, experiment_id, variant_id, event_type, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at
            ",
        )
        .bind(event.visitor_id)
        .bind(event.experiment_id)
        .bind(event.variant_id)
        .bind(event.event_type.as_str())
        .bind(&event.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(EventReceipt { id, created_at })
    }

    /// Inserts a batch of tracking events in a single transaction.
    /// An empty batch is a no-op.
    ///
    /// # Errors
    /// Returns `EngineError::Store` if the transaction fails.
    pub async fn insert_batch(&self, events: &[NewEvent]) -> Result<u64, EngineError> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(store_err)?;

        for event in events {
            sqlx::query(
                r"
                INSERT INTO events (visitor_id, experiment_id, variant_id, event_type, metadata)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(event.visitor_id)
            .bind(event.experiment_id)
            .bind(event.variant_id)
            .bind(event.event_type.as_str())
            .bind(&event.metadata)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;

        Ok(events.len() as u64)
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn query_aggregates(
        &self,
        experiment_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<VariantAggregate>, EngineError> {
        let conversion_types: Vec<&str> =
            CONVERSION_EVENTS.iter().map(|t| t.as_str()).collect();

        // LEFT JOIN + COALESCE keeps counts for variant ids the system no
        // longer knows; they surface under the name 'unknown'.
        let rows: Vec<VariantAggregateRow> = sqlx::query_as(
            r"
            SELECT
                e.variant_id,
                COALESCE(v.name, 'unknown') AS variant_name,
                COUNT(*) AS total_events,
                COUNT(DISTINCT e.visitor_id) AS unique_visitors,
                COUNT(*) FILTER (WHERE e.event_type = 'page_view') AS page_views,
                COUNT(*) FILTER (WHERE e.event_type = 'click') AS clicks,
                COUNT(*) FILTER (WHERE e.event_type = 'form_submit') AS form_submits,
                COUNT(*) FILTER (WHERE e.event_type = 'cta_click') AS cta_clicks,
                COUNT(*) FILTER (WHERE e.event_type = 'scroll_depth') AS scroll_depths,
                COUNT(DISTINCT e.visitor_id) FILTER (WHERE e.event_type = ANY($4)) AS conversions
            FROM events e
            LEFT JOIN variants v ON v.id = e.variant_id
            WHERE e.experiment_id = $1
              AND ($2::timestamptz IS NULL OR e.created_at >= $2)
              AND ($3::timestamptz IS NULL OR e.created_at <= $3)
            GROUP BY e.variant_id, v.name
            ORDER BY e.variant_id
            ",
        )
        .bind(experiment_id)
        .bind(start)
        .bind(end)
        .bind(&conversion_types)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows.into_iter().map(VariantAggregateRow::into_aggregate).collect())
    }
}

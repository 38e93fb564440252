//! Assignment repository.
//!
//! Assignment rows are write-once; the table's UNIQUE
//! (visitor_id, experiment_id) constraint is the only synchronization
//! primitive, which keeps the flow correct across independent service
//! instances.

use async_trait::async_trait;
use splitflow_core::{AssignedVariant, AssignmentStore, EngineError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repositories::store_err;

/// Repository for visitor-to-variant assignment rows.
#[derive(Debug, Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssignmentStore for AssignmentRepository {
    async fn get(
        &self,
        visitor_id: Uuid,
        experiment_id: Uuid,
    ) -> Result<Option<AssignedVariant>, EngineError> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            r"
            SELECT a.variant_id, v.name
            FROM assignments a
            JOIN variants v ON v.id = a.variant_id
            WHERE a.visitor_id = $1 AND a.experiment_id = $2
            ",
        )
        .bind(visitor_id)
        .bind(experiment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(|(variant_id, variant_name)| AssignedVariant {
            variant_id,
            variant_name,
        }))
    }

    async fn persist_and_fetch(
        &self,
        visitor_id: Uuid,
        experiment_id: Uuid,
        variant_id: Uuid,
    ) -> Result<AssignedVariant, EngineError> {
        // Insert and canonical re-read share one transaction so no
        // visibility gap opens between them. Losing the insert race to a
        // concurrent request leaves the conflict-ignore insert a no-op and
        // the re-read returns the winner's row.
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query(
            r"
            INSERT INTO assignments (visitor_id, experiment_id, variant_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (visitor_id, experiment_id) DO NOTHING
            ",
        )
        .bind(visitor_id)
        .bind(experiment_id)
        .bind(variant_id)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        let (variant_id, variant_name): (Uuid, String) = sqlx::query_as(
            r"
            SELECT a.variant_id, v.name
            FROM assignments a
            JOIN variants v ON v.id = a.variant_id
            WHERE a.visitor_id = $1 AND a.experiment_id = $2
            ",
        )
        .bind(visitor_id)
        .bind(experiment_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;

        Ok(AssignedVariant {
            variant_id,
            variant_name,
        })
    }
}

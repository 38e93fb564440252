//! Experiment repository.
//!
//! Provides atomic experiment-plus-variants creation and ordered reads.

use async_trait::async_trait;
use splitflow_core::validation::{validate_new_experiment, validate_update_experiment};
use splitflow_core::{EngineError, Experiment, ExperimentStore, NewExperiment, UpdateExperiment};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ExperimentRecord, VariantRecord};
use crate::repositories::store_err;

/// Repository for experiment and variant operations.
#[derive(Debug, Clone)]
pub struct ExperimentRepository {
    pool: PgPool,
}

impl ExperimentRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates an experiment together with its variants in one
    /// transaction. Any variant insert failure rolls back the whole
    /// creation.
    ///
    /// # Errors
    /// Returns `EngineError::Validation` for malformed input and
    /// `EngineError::Store` if the transaction fails.
    pub async fn create(&self, input: NewExperiment) -> Result<Experiment, EngineError> {
        validate_new_experiment(&input)?;

        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let experiment: ExperimentRecord = sqlx::query_as(
            r"
            INSERT INTO experiments (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, status, created_at, updated_at
            ",
        )
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_err)?;

        let mut variants = Vec::with_capacity(input.variants.len());
        for (position, (variant, pct)) in
            input.variants.iter().zip(&input.traffic_split).enumerate()
        {
            let row: VariantRecord = sqlx::query_as(
                r"
                INSERT INTO variants (experiment_id, name, description, traffic_pct, position)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, experiment_id, name, description, traffic_pct, position, created_at
                ",
            )
            .bind(experiment.id)
            .bind(&variant.name)
            .bind(&variant.description)
            .bind(i16::from(*pct))
            .bind(position as i16)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_err)?;
            variants.push(row);
        }

        tx.commit().await.map_err(store_err)?;

        tracing::info!(
            experiment_id = %experiment.id,
            variants = variants.len(),
            "created experiment"
        );

        experiment.into_experiment(variants)
    }

    /// Lists all experiments, newest first, each with its ordered variants.
    ///
    /// # Errors
    /// Returns `EngineError::Store` if a query fails.
    pub async fn list(&self) -> Result<Vec<Experiment>, EngineError> {
        let records: Vec<ExperimentRecord> = sqlx::query_as(
            r"
            SELECT id, name, description, status, created_at, updated_at
            FROM experiments
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut experiments = Vec::with_capacity(records.len());
        for record in records {
            let variants = self.variants_of(record.id).await?;
            experiments.push(record.into_experiment(variants)?);
        }
        Ok(experiments)
    }

    /// Applies a partial update and returns the refreshed experiment, or
    /// `None` if it does not exist.
    ///
    /// # Errors
    /// Returns `EngineError::Validation` for out-of-range fields and
    /// `EngineError::Store` if the update fails.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateExperiment,
    ) -> Result<Option<Experiment>, EngineError> {
        validate_update_experiment(&input)?;

        let result = sqlx::query(
            r"
            UPDATE experiments
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.name)
        .bind(input.description)
        .bind(input.status.map(|s| s.as_str()))
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch(id).await
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Experiment>, EngineError> {
        let record: Option<ExperimentRecord> = sqlx::query_as(
            r"
            SELECT id, name, description, status, created_at, updated_at
            FROM experiments
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        let Some(record) = record else {
            return Ok(None);
        };
        let variants = self.variants_of(record.id).await?;
        Ok(Some(record.into_experiment(variants)?))
    }

    async fn variants_of(&self, experiment_id: Uuid) -> Result<Vec<VariantRecord>, EngineError> {
        sqlx::query_as(
            r"
            SELECT id, experiment_id, name, description, traffic_pct, position, created_at
            FROM variants
            WHERE experiment_id = $1
            ORDER BY position ASC
            ",
        )
        .bind(experiment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }
}

#[async_trait]
impl ExperimentStore for ExperimentRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Experiment>, EngineError> {
        self.fetch(id).await
    }
}

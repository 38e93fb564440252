//! Visitor assignment engine.
//!
//! Gives every visitor a stable variant forever. The deterministic bucket
//! hash makes concurrent first-time requests compute the same pick, and
//! the store's conflict-ignore insert plus canonical re-read makes all
//! callers converge on the one persisted row even if they did not.

use splitflow_core::{
    bucket, pick_variant, AssignedVariant, AssignmentStore, EngineError, ExperimentStatus,
    ExperimentStore,
};
use uuid::Uuid;

/// Orchestrates the race-safe assignment protocol over the experiment and
/// assignment stores.
pub struct AssignmentEngine<E, A> {
    experiments: E,
    assignments: A,
}

impl<E, A> AssignmentEngine<E, A>
where
    E: ExperimentStore,
    A: AssignmentStore,
{
    pub fn new(experiments: E, assignments: A) -> Self {
        Self {
            experiments,
            assignments,
        }
    }

    /// Returns the visitor's variant for the experiment, assigning one on
    /// first contact.
    ///
    /// # Errors
    /// Returns `EngineError::NotFound` if the experiment is missing or has
    /// no variants, `EngineError::InactiveExperiment` if a first-time
    /// assignment hits a non-active experiment, and `EngineError::Store`
    /// on persistence failure.
    pub async fn assign(
        &self,
        visitor_id: Uuid,
        experiment_id: Uuid,
    ) -> Result<AssignedVariant, EngineError> {
        // An existing assignment takes priority over everything else:
        // it is never recomputed or invalidated, even after the
        // experiment's split or status changes.
        if let Some(existing) = self.assignments.get(visitor_id, experiment_id).await? {
            return Ok(existing);
        }

        let experiment = self
            .experiments
            .get_by_id(experiment_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("experiment {experiment_id} not found")))?;

        // Status gates first-time assignment only.
        if experiment.status != ExperimentStatus::Active {
            return Err(EngineError::InactiveExperiment {
                id: experiment_id,
                status: experiment.status,
            });
        }

        if experiment.variants.is_empty() {
            return Err(EngineError::not_found(format!(
                "experiment {experiment_id} has no variants"
            )));
        }

        let bucket = bucket(&visitor_id.to_string(), &experiment_id.to_string());
        let chosen = pick_variant(bucket, &experiment.variants).ok_or_else(|| {
            EngineError::not_found(format!("experiment {experiment_id} has no variants"))
        })?;

        tracing::debug!(
            %visitor_id,
            %experiment_id,
            bucket,
            variant = %chosen.name,
            "computed first-time assignment"
        );

        // Conflict-ignore insert, then return whatever the store
        // canonically holds. Losing the insert race is a success path:
        // all concurrent callers converge on the winner's row.
        self.assignments
            .persist_and_fetch(visitor_id, experiment_id, chosen.id)
            .await
    }
}

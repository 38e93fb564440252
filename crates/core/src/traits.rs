//! Repository trait seams between the engines and the persistence layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{AssignedVariant, Experiment, VariantAggregate};

/// Read access to experiments and their ordered variant sets.
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    /// Fetches an experiment with its variants ordered by creation time.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Experiment>, EngineError>;
}

/// Access to the write-once assignment rows.
///
/// The store's uniqueness constraint on (visitor, experiment) is the
/// system's sole synchronization primitive; implementations hold no
/// in-process locks.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Returns the existing assignment for the pair, if any.
    async fn get(
        &self,
        visitor_id: Uuid,
        experiment_id: Uuid,
    ) -> Result<Option<AssignedVariant>, EngineError>;

    /// Inserts the assignment with conflict-ignore semantics, then
    /// re-reads the same key on the same session and returns whatever is
    /// canonically stored. Losing the insert race is a success path.
    async fn persist_and_fetch(
        &self,
        visitor_id: Uuid,
        experiment_id: Uuid,
        variant_id: Uuid,
    ) -> Result<AssignedVariant, EngineError>;
}

/// Read access to per-variant event aggregates.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Returns per-variant raw counters for events of an experiment within
    /// the window (inclusive on both ends, unbounded when `None`), grouped
    /// and ordered by variant id.
    async fn query_aggregates(
        &self,
        experiment_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<VariantAggregate>, EngineError>;
}

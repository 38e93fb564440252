//! Experiment statistics engine.
//!
//! Read-only composition of per-variant event aggregates with the
//! chi-squared significance test. Tolerates eventual consistency with
//! respect to events still being ingested.

use chrono::{DateTime, Utc};
use splitflow_core::{
    significance, EngineError, EventStore, ExperimentStats, ExperimentStore, VariantCounts,
    VariantStats,
};
use uuid::Uuid;

/// Aggregates tracking events per variant and derives significance.
pub struct StatsEngine<E, V> {
    experiments: E,
    events: V,
}

impl<E, V> StatsEngine<E, V>
where
    E: ExperimentStore,
    V: EventStore,
{
    pub fn new(experiments: E, events: V) -> Self {
        Self {
            experiments,
            events,
        }
    }

    /// Returns per-variant counters for the experiment within the window
    /// (inclusive on both ends, unbounded when omitted), ordered by
    /// variant id.
    ///
    /// # Errors
    /// Returns `EngineError::Store` if the aggregate query fails.
    pub async fn aggregate(
        &self,
        experiment_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<VariantStats>, EngineError> {
        let rows = self.events.query_aggregates(experiment_id, start, end).await?;
        Ok(rows.iter().map(VariantStats::from_aggregate).collect())
    }

    /// Computes the full experiment statistics: per-variant stats, total
    /// visitors, and the chi-squared confidence over variants with data.
    ///
    /// # Errors
    /// Returns `EngineError::NotFound` if the experiment does not exist
    /// and `EngineError::Store` if a query fails.
    pub async fn experiment_stats(
        &self,
        experiment_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<ExperimentStats, EngineError> {
        let experiment = self
            .experiments
            .get_by_id(experiment_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("experiment {experiment_id} not found")))?;

        let rows = self.events.query_aggregates(experiment_id, start, end).await?;

        let variants: Vec<VariantStats> =
            rows.iter().map(VariantStats::from_aggregate).collect();
        let total_visitors = variants.iter().map(|v| v.unique_visitors).sum();

        let counts: Vec<VariantCounts> = rows
            .iter()
            .map(|r| VariantCounts {
                conversions: r.conversions,
                visitors: r.unique_visitors,
            })
            .collect();
        let (confidence, significance_reached) = significance(&counts);

        Ok(ExperimentStats {
            experiment_id,
            experiment_name: experiment.name,
            total_visitors,
            variants,
            confidence,
            significance_reached,
        })
    }
}

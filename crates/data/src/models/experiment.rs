//! Experiment and variant row models.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use splitflow_core::{EngineError, Experiment, ExperimentStatus, Variant};
use uuid::Uuid;

/// A row of the `experiments` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExperimentRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row of the `variants` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VariantRecord {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub name: String,
    pub description: String,
    pub traffic_pct: i16,
    pub position: i16,
    pub created_at: DateTime<Utc>,
}

impl ExperimentRecord {
    /// Combines the experiment row with its ordered variant rows into the
    /// domain type.
    ///
    /// # Errors
    /// Returns `EngineError::Store` if a row carries a status or traffic
    /// percentage outside the schema's constraints.
    pub fn into_experiment(self, variants: Vec<VariantRecord>) -> Result<Experiment, EngineError> {
        let status = ExperimentStatus::parse(&self.status)
            .ok_or_else(|| EngineError::Store(anyhow!("unknown experiment status: {}", self.status)))?;

        let mut domain_variants = Vec::with_capacity(variants.len());
        let mut traffic_split = Vec::with_capacity(variants.len());
        for row in variants {
            let pct = u8::try_from(row.traffic_pct)
                .map_err(|_| EngineError::Store(anyhow!("traffic_pct out of range: {}", row.traffic_pct)))?;
            traffic_split.push(pct);
            domain_variants.push(Variant {
                id: row.id,
                name: row.name,
                traffic_pct: pct,
            });
        }

        Ok(Experiment {
            id: self.id,
            name: self.name,
            description: self.description,
            status,
            variants: domain_variants,
            traffic_split,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experiment_row(status: &str) -> ExperimentRecord {
        ExperimentRecord {
            id: Uuid::new_v4(),
            name: "Homepage Hero Test".to_string(),
            description: String::new(),
            status: status.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn variant_row(experiment_id: Uuid, name: &str, pct: i16, position: i16) -> VariantRecord {
        VariantRecord {
            id: Uuid::new_v4(),
            experiment_id,
            name: name.to_string(),
            description: String::new(),
            traffic_pct: pct,
            position,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_into_experiment_preserves_variant_order() {
        let row = experiment_row("active");
        let id = row.id;
        let experiment = row
            .into_experiment(vec![
                variant_row(id, "control", 50, 0),
                variant_row(id, "variant_a", 50, 1),
            ])
            .unwrap();

        assert_eq!(experiment.status, ExperimentStatus::Active);
        assert_eq!(experiment.variants[0].name, "control");
        assert_eq!(experiment.variants[1].name, "variant_a");
        assert_eq!(experiment.traffic_split, vec![50, 50]);
    }

    #[test]
    fn test_into_experiment_rejects_unknown_status() {
        let row = experiment_row("archived");
        let err = row.into_experiment(Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
    }
}

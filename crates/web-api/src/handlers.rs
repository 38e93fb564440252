use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use splitflow_core::{
    EngineError, EventType, Experiment, ExperimentStats, ExperimentStatus, ExperimentStore,
    NewEvent, NewExperiment, NewVariant, UpdateExperiment, VariantStats,
};
use uuid::Uuid;

use crate::server::AppState;

// =============================================================================
// Error mapping
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Maps a domain error kind to its HTTP status code and JSON body.
fn error_response(err: &EngineError) -> ApiError {
    let status = match err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InactiveExperiment { .. } => StatusCode::CONFLICT,
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignVariantRequest {
    pub visitor_id: Uuid,
    pub experiment_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignVariantResponse {
    pub visitor_id: Uuid,
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub variant_name: String,
}

#[derive(Debug, Deserialize)]
pub struct VariantInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExperimentRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub variants: Vec<VariantInput>,
    pub traffic_split: Vec<u8>,
}

impl From<CreateExperimentRequest> for NewExperiment {
    fn from(req: CreateExperimentRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            variants: req
                .variants
                .into_iter()
                .map(|v| NewVariant {
                    name: v.name,
                    description: v.description,
                })
                .collect(),
            traffic_split: req.traffic_split,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExperimentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ExperimentStatus>,
}

impl From<UpdateExperimentRequest> for UpdateExperiment {
    fn from(req: UpdateExperimentRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            status: req.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VariantResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "trafficPct")]
    pub traffic_pct: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ExperimentStatus,
    pub variants: Vec<VariantResponse>,
    pub traffic_split: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Experiment> for ExperimentResponse {
    fn from(experiment: Experiment) -> Self {
        Self {
            id: experiment.id,
            name: experiment.name,
            description: experiment.description,
            status: experiment.status,
            variants: experiment
                .variants
                .into_iter()
                .map(|v| VariantResponse {
                    id: v.id,
                    name: v.name,
                    traffic_pct: v.traffic_pct,
                })
                .collect(),
            traffic_split: experiment.traffic_split,
            created_at: experiment.created_at,
            updated_at: experiment.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStatsResponse {
    pub variant_id: Uuid,
    pub variant_name: String,
    pub total_events: u64,
    pub unique_visitors: u64,
    pub event_breakdown: BTreeMap<EventType, u64>,
    pub conversion_rate: f64,
}

impl From<VariantStats> for VariantStatsResponse {
    fn from(stats: VariantStats) -> Self {
        Self {
            variant_id: stats.variant_id,
            variant_name: stats.variant_name,
            total_events: stats.total_events,
            unique_visitors: stats.unique_visitors,
            event_breakdown: stats.event_breakdown,
            conversion_rate: stats.conversion_rate,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentStatsResponse {
    pub experiment_id: Uuid,
    pub experiment_name: String,
    pub total_visitors: u64,
    pub variants: Vec<VariantStatsResponse>,
    pub confidence: Option<f64>,
    pub significance_reached: bool,
}

impl From<ExperimentStats> for ExperimentStatsResponse {
    fn from(stats: ExperimentStats) -> Self {
        Self {
            experiment_id: stats.experiment_id,
            experiment_name: stats.experiment_name,
            total_visitors: stats.total_visitors,
            variants: stats.variants.into_iter().map(Into::into).collect(),
            confidence: stats.confidence,
            significance_reached: stats.significance_reached,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestEventRequest {
    pub visitor_id: Uuid,
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub event_type: EventType,
    #[serde(default = "empty_metadata")]
    pub metadata: JsonValue,
}

fn empty_metadata() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}

impl From<IngestEventRequest> for NewEvent {
    fn from(req: IngestEventRequest) -> Self {
        Self {
            visitor_id: req.visitor_id,
            experiment_id: req.experiment_id,
            variant_id: req.variant_id,
            event_type: req.event_type,
            metadata: req.metadata,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestEventResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct IngestBatchResponse {
    pub count: u64,
}

// =============================================================================
// Handlers
// =============================================================================

/// Service liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "splitflow",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Assigns the visitor to a variant, creating the assignment on first
/// contact.
///
/// # Errors
/// `404` if the experiment is missing or has no variants, `409` if it is
/// not active, `500` on store failure.
pub async fn assign_visitor(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssignVariantRequest>,
) -> Result<Json<AssignVariantResponse>, ApiError> {
    let assigned = state
        .assignment
        .assign(req.visitor_id, req.experiment_id)
        .await
        .map_err(|e| error_response(&e))?;

    Ok(Json(AssignVariantResponse {
        visitor_id: req.visitor_id,
        experiment_id: req.experiment_id,
        variant_id: assigned.variant_id,
        variant_name: assigned.variant_name,
    }))
}

/// Lists all experiments with their variants.
///
/// # Errors
/// `500` on store failure.
pub async fn list_experiments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ExperimentResponse>>, ApiError> {
    let experiments = state
        .experiments
        .list()
        .await
        .map_err(|e| error_response(&e))?;

    Ok(Json(experiments.into_iter().map(Into::into).collect()))
}

/// Creates an experiment with its variants atomically.
///
/// # Errors
/// `400` for malformed input, `500` on store failure.
pub async fn create_experiment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateExperimentRequest>,
) -> Result<(StatusCode, Json<ExperimentResponse>), ApiError> {
    let experiment = state
        .experiments
        .create(req.into())
        .await
        .map_err(|e| error_response(&e))?;

    Ok((StatusCode::CREATED, Json(experiment.into())))
}

/// Gets a single experiment.
///
/// # Errors
/// `404` if the experiment does not exist, `500` on store failure.
pub async fn get_experiment(
    State(state): State<Arc<AppState>>,
    Path(experiment_id): Path<Uuid>,
) -> Result<Json<ExperimentResponse>, ApiError> {
    let experiment = state
        .experiments
        .get_by_id(experiment_id)
        .await
        .map_err(|e| error_response(&e))?
        .ok_or_else(|| {
            error_response(&EngineError::not_found(format!(
                "experiment {experiment_id} not found"
            )))
        })?;

    Ok(Json(experiment.into()))
}

/// Applies a partial update to an experiment.
///
/// # Errors
/// `400` for malformed input, `404` if the experiment does not exist,
/// `500` on store failure.
pub async fn update_experiment(
    State(state): State<Arc<AppState>>,
    Path(experiment_id): Path<Uuid>,
    Json(req): Json<UpdateExperimentRequest>,
) -> Result<Json<ExperimentResponse>, ApiError> {
    let experiment = state
        .experiments
        .update(experiment_id, req.into())
        .await
        .map_err(|e| error_response(&e))?
        .ok_or_else(|| {
            error_response(&EngineError::not_found(format!(
                "experiment {experiment_id} not found"
            )))
        })?;

    Ok(Json(experiment.into()))
}

/// Computes experiment statistics over an optional time window.
///
/// # Errors
/// `404` if the experiment does not exist, `500` on store failure.
pub async fn experiment_stats(
    State(state): State<Arc<AppState>>,
    Path(experiment_id): Path<Uuid>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ExperimentStatsResponse>, ApiError> {
    let stats = state
        .stats
        .experiment_stats(experiment_id, query.start_date, query.end_date)
        .await
        .map_err(|e| error_response(&e))?;

    Ok(Json(stats.into()))
}

/// Ingests a single tracking event.
///
/// # Errors
/// `500` on store failure.
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestEventRequest>,
) -> Result<(StatusCode, Json<IngestEventResponse>), ApiError> {
    let receipt = state
        .events
        .insert(&req.into())
        .await
        .map_err(|e| error_response(&e))?;

    Ok((
        StatusCode::CREATED,
        Json(IngestEventResponse {
            id: receipt.id,
            created_at: receipt.created_at,
        }),
    ))
}

/// Ingests a batch of tracking events in one transaction.
///
/// # Errors
/// `500` on store failure.
pub async fn ingest_event_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Vec<IngestEventRequest>>,
) -> Result<(StatusCode, Json<IngestBatchResponse>), ApiError> {
    let events: Vec<NewEvent> = req.into_iter().map(Into::into).collect();
    let count = state
        .events
        .insert_batch(&events)
        .await
        .map_err(|e| error_response(&e))?;

    Ok((StatusCode::CREATED, Json(IngestBatchResponse { count })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_status_codes() {
        let (status, _) = error_response(&EngineError::not_found("missing"));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = error_response(&EngineError::InactiveExperiment {
            id: Uuid::nil(),
            status: ExperimentStatus::Completed,
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = error_response(&EngineError::validation("bad split"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = error_response(&EngineError::Store(anyhow::anyhow!("down")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.error.contains("down"));
    }

    #[test]
    fn test_assignment_request_uses_camel_case() {
        let req: AssignVariantRequest = serde_json::from_str(
            r#"{
                "visitorId": "550e8400-e29b-41d4-a716-446655440000",
                "experimentId": "6ba7b810-9dad-11d1-80b4-00c04fd430c8"
            }"#,
        )
        .unwrap();
        assert_eq!(
            req.visitor_id,
            "550e8400-e29b-41d4-a716-446655440000".parse::<Uuid>().unwrap()
        );
    }

    #[test]
    fn test_event_request_defaults_metadata_to_empty_object() {
        let req: IngestEventRequest = serde_json::from_str(
            r#"{
                "visitorId": "550e8400-e29b-41d4-a716-446655440000",
                "experimentId": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
                "variantId": "3b241101-e2bb-4255-8caf-4136c566a962",
                "eventType": "cta_click"
            }"#,
        )
        .unwrap();
        assert_eq!(req.event_type, EventType::CtaClick);
        assert_eq!(req.metadata, serde_json::json!({}));
    }

    #[test]
    fn test_stats_response_serializes_breakdown_keys() {
        let response = VariantStatsResponse {
            variant_id: Uuid::nil(),
            variant_name: "control".to_string(),
            total_events: 2,
            unique_visitors: 1,
            event_breakdown: BTreeMap::from([
                (EventType::PageView, 1),
                (EventType::CtaClick, 1),
            ]),
            conversion_rate: 1.0,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["eventBreakdown"]["page_view"], 1);
        assert_eq!(json["eventBreakdown"]["cta_click"], 1);
        assert_eq!(json["conversionRate"], 1.0);
    }
}

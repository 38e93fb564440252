use crate::handlers;
use axum::{
    routing::{get, post, put},
    Router,
};
use splitflow_data::{
    AssignmentRepository, EventRepository, ExperimentRepository, Repositories,
};
use splitflow_engine::{AssignmentEngine, StatsEngine};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Engines and repositories shared by all handlers.
pub struct AppState {
    pub assignment: AssignmentEngine<ExperimentRepository, AssignmentRepository>,
    pub stats: StatsEngine<ExperimentRepository, EventRepository>,
    pub experiments: ExperimentRepository,
    pub events: EventRepository,
}

impl AppState {
    /// Wires the engines to the repositories over a single pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let repos = Repositories::new(pool);
        Self {
            assignment: AssignmentEngine::new(
                repos.experiments.clone(),
                repos.assignments.clone(),
            ),
            stats: StatsEngine::new(repos.experiments.clone(), repos.events.clone()),
            experiments: repos.experiments,
            events: repos.events,
        }
    }
}

pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            state: Arc::new(AppState::new(pool)),
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/health", get(handlers::health))
            .route("/api/assignments", post(handlers::assign_visitor))
            .route("/api/experiments", get(handlers::list_experiments))
            .route("/api/experiments", post(handlers::create_experiment))
            .route(
                "/api/experiments/:experiment_id",
                get(handlers::get_experiment),
            )
            .route(
                "/api/experiments/:experiment_id",
                put(handlers::update_experiment),
            )
            .route(
                "/api/experiments/:experiment_id/stats",
                get(handlers::experiment_stats),
            )
            .route("/api/events", post(handlers::ingest_event))
            .route("/api/events/batch", post(handlers::ingest_event_batch))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or
    /// serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

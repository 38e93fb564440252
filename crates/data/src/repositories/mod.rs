//! Database repositories for the split testing service.
//!
//! Each repository provides typed access to a specific table; the
//! assignment and event repositories implement the core store traits
//! consumed by the engines.

pub mod assignment_repo;
pub mod event_repo;
pub mod experiment_repo;

pub use assignment_repo::AssignmentRepository;
pub use event_repo::{EventReceipt, EventRepository};
pub use experiment_repo::ExperimentRepository;

use splitflow_core::EngineError;
use sqlx::PgPool;

/// Maps a persistence failure to the domain error kind.
pub(crate) fn store_err(err: sqlx::Error) -> EngineError {
    EngineError::Store(err.into())
}

/// Creates all repositories from a single database pool.
pub struct Repositories {
    pub experiments: ExperimentRepository,
    pub assignments: AssignmentRepository,
    pub events: EventRepository,
}

impl Repositories {
    /// Creates a new set of repositories from a database pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            experiments: ExperimentRepository::new(pool.clone()),
            assignments: AssignmentRepository::new(pool.clone()),
            events: EventRepository::new(pool),
        }
    }
}

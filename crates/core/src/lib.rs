pub mod bucket;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod model;
pub mod significance;
pub mod traits;
pub mod validation;

pub use bucket::{bucket, pick_variant};
pub use config::{AppConfig, DatabaseConfig, ServerConfig};
pub use config_loader::ConfigLoader;
pub use error::EngineError;
pub use model::{
    AssignedVariant, Assignment, EventType, Experiment, ExperimentStats, ExperimentStatus,
    NewEvent, NewExperiment, NewVariant, TrackingEvent, UpdateExperiment, Variant,
    VariantAggregate, VariantStats, CONVERSION_EVENTS,
};
pub use significance::{chi_squared, chi_squared_p_value, significance, VariantCounts};
pub use traits::{AssignmentStore, EventStore, ExperimentStore};

//! Row models for the split testing tables.
//!
//! Models derive `sqlx::FromRow` and convert into the core domain types.

pub mod event;
pub mod experiment;

pub use event::VariantAggregateRow;
pub use experiment::{ExperimentRecord, VariantRecord};

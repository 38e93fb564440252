//! Data storage and management for the split testing service.
//!
//! This crate provides:
//! - `PostgreSQL` pool setup and embedded schema migrations
//! - Row models for experiments, variants, and event aggregates
//! - Repositories implementing the core store traits

pub mod database;
pub mod models;
pub mod repositories;

pub use database::{connect, run_migrations};

// Re-export models
pub use models::{ExperimentRecord, VariantAggregateRow, VariantRecord};

// Re-export repositories
pub use repositories::{
    AssignmentRepository, EventReceipt, EventRepository, ExperimentRepository, Repositories,
};

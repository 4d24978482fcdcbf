//! retailhub runner: loading, constraint application and orchestration.
//!
//! This crate builds on `retailhub-core` to provide:
//! - Destination stores (PostgreSQL and in-memory) with TEXT staging loads
//! - The schema loader and its ordered constraint plan
//! - The stage graph and the per-entity state machine
//! - Run reports and TOML configuration

pub mod config;
pub mod destination;
pub mod graph;
pub mod loader;
pub mod orchestrator;
pub mod report;
pub mod wiring;

pub use config::{ConfigError, ConnectionConfig, PipelineConfig, RunConfig, SourcesConfig, StoreApiConfig};
pub use destination::{Destination, LoadError, MemoryDestination, PostgresDestination};
pub use graph::{Stage, StageGraph};
pub use loader::{LoadSummary, SchemaLoader};
pub use orchestrator::{extract_and_clean, EntityState, Orchestrator, PipelineError, RunOptions, SourceSet};
pub use report::{ConstraintOutcome, EntityReport, RunReport};
pub use wiring::{build_sources, WiringError};

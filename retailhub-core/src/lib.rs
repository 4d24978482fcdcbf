//! retailhub core: record sets, typed retail entities, source adapters and cleaners.
//!
//! This crate holds everything that happens before a table reaches the
//! destination store:
//! - Loosely typed record sets produced at the adapter boundary
//! - Source adapters for relational tables, PDF documents, the store API and object storage
//! - One cleaner per entity, turning raw records into typed rows
//! - The table/column model and the constraint plan applied after loading

pub mod clean;
pub mod domain;
pub mod entity;
pub mod record;
pub mod schema;
pub mod sources;
pub mod table;

pub use entity::EntityKind;
pub use record::{RawRecord, RecordSet};

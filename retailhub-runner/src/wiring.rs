//! Builds the production adapter for each entity from the configuration.

use crate::config::{ConfigError, PipelineConfig};
use crate::orchestrator::SourceSet;
use retailhub_core::sources::{
    ApiAdapter, DocumentAdapter, HttpRecordApi, ObjectStoreAdapter, PostgresSource, RelationalAdapter,
    SourceError, TableReader,
};
use retailhub_core::EntityKind;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WiringError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Users and orders share one lazily connected source database.
pub fn build_sources(config: &PipelineConfig) -> Result<SourceSet, WiringError> {
    let sources = &config.sources;
    let database: Arc<dyn TableReader> =
        Arc::new(PostgresSource::new(config.source_database.connection_string()));

    let api = &sources.store_api;
    let store_api = HttpRecordApi::new(
        api.count_endpoint.clone(),
        api.record_endpoint.clone(),
        vec![(api.api_key_header.clone(), api.api_key.clone())],
    )?
    .with_count_field(api.count_field.clone());

    Ok(SourceSet::new()
        .with(
            EntityKind::Users,
            Box::new(RelationalAdapter::new(Arc::clone(&database), sources.users_table.clone())),
        )
        .with(
            EntityKind::Orders,
            Box::new(RelationalAdapter::new(database, sources.orders_table.clone())),
        )
        .with(
            EntityKind::Cards,
            Box::new(DocumentAdapter::new(&sources.card_document)?),
        )
        .with(EntityKind::Stores, Box::new(ApiAdapter::new(store_api)))
        .with(
            EntityKind::Products,
            Box::new(ObjectStoreAdapter::new(
                &sources.products_object,
                sources.products_format()?,
            )?),
        )
        .with(
            EntityKind::DateTimes,
            Box::new(ObjectStoreAdapter::new(
                &sources.date_times_object,
                sources.date_times_format()?,
            )?),
        ))
}

pub mod export_service;
pub mod identity;
pub mod ingest_service;
pub mod metrics;
pub mod pipeline_service;
pub mod reconcile_service;
pub mod schema;
pub mod series_service;

//! Ingestion trigger

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::IngestReport;

/// POST /api/ingest - Rebuild the index from the configured campaign
///
/// Runs to completion before responding. Per-document failures are listed in
/// the report; only a failure to list or prepare the collection is an error.
pub async fn ingest(State(state): State<AppState>) -> Result<Json<IngestReport>> {
    tracing::info!("Ingestion requested over HTTP");
    let report = state.ingest().await?;

    tracing::info!(
        "Ingestion finished: {} indexed, {} empty, {} failed, {} points in {}ms",
        report.documents_indexed,
        report.documents_empty,
        report.failures.len(),
        report.points_written,
        report.processing_time_ms
    );
    Ok(Json(report))
}

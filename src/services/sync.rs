//! Full-scan resynchronization of the search index from the primary store.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::db::Store;
use crate::index::{BulkItemFailure, IndexError, SearchDocument, SearchIndex};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to read farmers from the primary store: {0}")]
    Store(String),

    #[error("Failed to write the search index: {0}")]
    Index(#[from] IndexError),
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err.to_string())
    }
}

/// Outcome of one resync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub total: usize,
    pub indexed: usize,
    pub failed: Vec<BulkItemFailure>,
    pub duration_ms: u64,
}

/// Sole writer of the search index.
///
/// Runs are serialized; a second caller waits for the one in flight and then
/// performs its own full scan.
pub struct IndexSynchronizer {
    store: Store,
    index: Arc<dyn SearchIndex>,
    lock: Mutex<()>,
}

impl IndexSynchronizer {
    #[must_use]
    pub fn new(store: Store, index: Arc<dyn SearchIndex>) -> Self {
        Self {
            store,
            index,
            lock: Mutex::new(()),
        }
    }

    /// Reads every farmer, rebuilds its document and upserts all of them in
    /// one bulk write.
    ///
    /// # Errors
    ///
    /// Fails as a whole when the store cannot be read or the index cannot
    /// commit. Per-document rejections are returned in the report instead.
    pub async fn resync(&self) -> Result<SyncReport, SyncError> {
        let _guard = self.lock.lock().await;
        let start = Instant::now();
        info!(event = "resync_started", "Search index resync started");

        let farmers = self.store.list_all_farmers().await.inspect_err(|e| {
            warn!(event = "resync_failed", stage = "read", error = %e, "Resync aborted");
        })?;

        let documents: Vec<SearchDocument> = farmers.iter().map(SearchDocument::from).collect();
        let total = documents.len();

        let response = self.index.bulk_upsert(documents).await.inspect_err(|e| {
            warn!(event = "resync_failed", stage = "write", error = %e, "Resync aborted");
        })?;

        for failure in &response.failures {
            warn!(
                event = "resync_document_failed",
                farmer_id = failure.id,
                reason = %failure.reason,
                "Document rejected by the search index"
            );
        }

        let report = SyncReport {
            total,
            indexed: response.indexed,
            failed: response.failures,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        metrics::counter!("search_resync_runs_total").increment(1);
        metrics::counter!("search_resync_failed_documents_total")
            .increment(report.failed.len() as u64);

        info!(
            event = "resync_finished",
            total = report.total,
            indexed = report.indexed,
            failed = report.failed.len(),
            duration_ms = report.duration_ms,
            "Search index resync finished"
        );

        Ok(report)
    }
}

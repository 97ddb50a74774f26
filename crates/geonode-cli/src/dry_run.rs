//! Catalog that writes what would be published instead of publishing it.

use std::io::{self, Write};
use std::sync::Mutex;

use geonode_core::{AppError, CatalogStore, DatasetDraft, PublishedRecord, ShowcaseDraft};
use serde_json::json;
use tracing::info;

/// Writes each dataset/showcase pair as one JSON line.
///
/// Searches find nothing, so pruning never removes anything.
pub struct JsonLinesCatalog<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonLinesCatalog<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesCatalog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> CatalogStore for JsonLinesCatalog<W> {
    async fn publish(&self, dataset: &DatasetDraft, showcase: &ShowcaseDraft) -> Result<(), AppError> {
        let line = serde_json::to_string(&json!({
            "dataset": dataset,
            "showcase": showcase,
        }))?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| AppError::Generic("output lock poisoned".to_string()))?;
        writeln!(out, "{}", line).map_err(|e| AppError::Generic(e.to_string()))
    }

    async fn search_by_organization(&self, _org_id: &str) -> Result<Vec<PublishedRecord>, AppError> {
        Ok(Vec::new())
    }

    async fn remove(&self, record: &PublishedRecord) -> Result<(), AppError> {
        info!("Dry run: would delete {}", record.name);
        Ok(())
    }
}

//! Trait definitions for external dependencies.
//!
//! The harvester talks to three things it does not own: a GeoNode server,
//! a country-name lookup and the catalog datasets are published to. Each is
//! a trait so the orchestration in [`crate::harvest`] can run against
//! in-memory doubles in tests.
//!
//! # Example
//!
//! ```
//! use geonode_core::traits::GeoNodeSource;
//!
//! // Business logic uses traits, not concrete types
//! async fn count_layers<S: GeoNodeSource>(
//!     source: &S,
//!     iso3: &str,
//! ) -> Result<usize, geonode_core::AppError> {
//!     Ok(source.fetch_layers(Some(iso3)).await?.len())
//! }
//! ```

use std::future::Future;

use crate::models::{DatasetDraft, PublishedRecord, RawLayer, RegionRecord, ShowcaseDraft};
use crate::AppError;

/// Read access to a GeoNode server's API.
pub trait GeoNodeSource: Send + Sync {
    /// Base URL of the server, without trailing slash.
    fn base_url(&self) -> &str;

    /// Lists the server's regions (`/api/regions`).
    fn fetch_regions(&self) -> impl Future<Output = Result<Vec<RegionRecord>, AppError>> + Send;

    /// Lists layers, optionally restricted to one region code.
    ///
    /// # Arguments
    ///
    /// * `region` - Region code to filter on; `None` lists every layer
    fn fetch_layers(
        &self,
        region: Option<&str>,
    ) -> impl Future<Output = Result<Vec<RawLayer>, AppError>> + Send;
}

/// Resolves region codes to country names.
pub trait CountryLookup: Send + Sync {
    /// English name of the country with this ISO3 code, `None` if the code
    /// is not a country.
    fn country_name(&self, iso3: &str) -> Option<String>;
}

/// The catalog datasets are published to.
pub trait CatalogStore: Send + Sync {
    /// Creates or updates a dataset and its showcase, and links the two.
    fn publish(
        &self,
        dataset: &DatasetDraft,
        showcase: &ShowcaseDraft,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Lists every dataset owned by an organisation.
    fn search_by_organization(
        &self,
        org_id: &str,
    ) -> impl Future<Output = Result<Vec<PublishedRecord>, AppError>> + Send;

    /// Deletes a dataset.
    fn remove(&self, record: &PublishedRecord) -> impl Future<Output = Result<(), AppError>> + Send;
}

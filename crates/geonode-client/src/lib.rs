//! GeoNode HDX Client - HTTP clients for external APIs
//!
//! This crate provides HTTP clients for interacting with:
//!
//! - [`geonode`] - GeoNode servers (regions and layers)
//! - [`ckan`] - the HDX catalog, a CKAN instance with the showcase extension
//!
//! # Overview
//!
//! The clients handle authentication, request building, response parsing,
//! and error handling for their respective APIs. Each request is made once:
//! a failure aborts the harvest that issued it.

pub mod ckan;
pub mod geonode;

// Re-export main client types
pub use ckan::CkanCatalog;
pub use geonode::GeoNodeClient;

use std::time::Duration;

use geonode_core::AppError;

/// Maps a failed `send()` to the matching `AppError` variant.
pub(crate) fn transport_error(e: reqwest::Error, timeout: Duration) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout.as_secs())
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {}", e))
    } else {
        AppError::ClientError(e.to_string())
    }
}

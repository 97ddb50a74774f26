use std::time::Duration;

use geonode_core::config::HttpConfig;
use geonode_core::error::AppError;
use geonode_core::models::{ApiList, RawLayer, RegionRecord};
use geonode_core::traits::GeoNodeSource;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::transport_error;

/// HTTP client for a GeoNode server's REST API.
///
/// # Examples
///
/// ```no_run
/// use geonode_client::GeoNodeClient;
/// use geonode_core::{GeoNodeSource, HttpConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GeoNodeClient::new("https://geonode.wfp.org", &HttpConfig::default())?;
/// let layers = client.fetch_layers(Some("SDN")).await?;
/// println!("Found {} layers", layers.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GeoNodeClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GeoNodeClient {
    /// Creates a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidServerUrl` if the URL is not an http(s) URL.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(base_url: &str, http: &HttpConfig) -> Result<Self, AppError> {
        let parsed =
            Url::parse(base_url).map_err(|_| AppError::InvalidServerUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::InvalidServerUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .user_agent(http.user_agent.as_str())
            .timeout(http.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: http.timeout,
        })
    }

    pub fn regions_url(&self) -> String {
        format!("{}/api/regions", self.base_url)
    }

    /// Layer list URL, filtered by region code when one is given.
    pub fn layers_url(&self, region: Option<&str>) -> String {
        match region {
            Some(code) => format!("{}/api/layers/?regions__code__in={}", self.base_url, code),
            None => format!("{}/api/layers", self.base_url),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AppError> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::ClientError(format!(
                "HTTP {} from {}",
                status.as_u16(),
                url
            )));
        }

        resp.json()
            .await
            .map_err(|e| AppError::ClientError(format!("Invalid response from {}: {}", url, e)))
    }
}

impl GeoNodeSource for GeoNodeClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_regions(&self) -> Result<Vec<RegionRecord>, AppError> {
        let list: ApiList<RegionRecord> = self.get_json(&self.regions_url()).await?;
        Ok(list.objects)
    }

    async fn fetch_layers(&self, region: Option<&str>) -> Result<Vec<RawLayer>, AppError> {
        let list: ApiList<RawLayer> = self.get_json(&self.layers_url(region)).await?;
        Ok(list.objects)
    }
}

use std::time::Duration;

use geonode_core::config::HttpConfig;
use geonode_core::error::AppError;
use geonode_core::models::{DatasetDraft, PublishedRecord, ShowcaseDraft};
use geonode_core::traits::CatalogStore;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::transport_error;

/// Page size for `package_search`.
const SEARCH_PAGE_SIZE: usize = 1000;

/// Generic wrapper for CKAN API responses.
///
/// CKAN API reference: <https://docs.ckan.org/en/2.9/api/>
///
/// CKAN always returns responses with the structure:
/// ```json
/// {
///     "success": bool,
///     "result": T,
///     "error": {"message": "...", "__type": "..."}
/// }
/// ```
#[derive(Deserialize, Debug)]
struct CkanResponse<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    error: Option<Value>,
}

/// Result of `package_search`.
#[derive(Deserialize, Debug)]
struct SearchResult {
    count: usize,
    results: Vec<CkanPackage>,
}

/// The fields of a CKAN package the harvester reads back.
///
/// # Examples
///
/// ```
/// use geonode_client::ckan::CkanPackage;
///
/// let json = r#"{
///     "id": "5a2c1f0e",
///     "name": "wfp-geonode-sdn-roads",
///     "title": "Sudan roads",
///     "maintainer": "d7a13725-5cb5-48f4-87ac-a70b5cea531e",
///     "owner_org": "3ecac442-7fed-448d-8f78-b385ef6f84e7",
///     "resources": [{"url": "https://geonode.wfp.org/geoserver/wfs?typename=geonode%3Asdn_roads"}]
/// }"#;
///
/// let package: CkanPackage = serde_json::from_str(json).unwrap();
/// let record = package.into_published_record();
/// assert_eq!(record.name, "wfp-geonode-sdn-roads");
/// assert!(record.primary_resource_url().unwrap().starts_with("https://geonode.wfp.org"));
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct CkanPackage {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub maintainer: Option<String>,
    #[serde(default)]
    pub owner_org: Option<String>,
    #[serde(default)]
    pub resources: Vec<CkanResource>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CkanResource {
    #[serde(default)]
    pub url: String,
}

impl CkanPackage {
    pub fn into_published_record(self) -> PublishedRecord {
        PublishedRecord {
            name: self.name,
            title: self.title,
            maintainer: self.maintainer,
            owner_org: self.owner_org,
            resource_urls: self.resources.into_iter().map(|r| r.url).collect(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct NameRef {
    name: String,
}

impl NameRef {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct HdxResource {
    name: String,
    url: String,
    description: String,
    format: String,
    resource_type: &'static str,
    url_type: &'static str,
}

/// Dataset payload for `package_create` and `package_update`.
#[derive(Serialize, Debug, Clone, PartialEq)]
struct HdxPackage {
    name: String,
    title: String,
    notes: String,
    maintainer: String,
    owner_org: String,
    dataset_date: String,
    data_update_frequency: &'static str,
    subnational: &'static str,
    groups: Vec<NameRef>,
    tags: Vec<NameRef>,
    resources: Vec<HdxResource>,
}

impl From<&DatasetDraft> for HdxPackage {
    fn from(dataset: &DatasetDraft) -> Self {
        Self {
            name: dataset.name.clone(),
            title: dataset.title.clone(),
            notes: dataset.notes.clone(),
            maintainer: dataset.maintainer.clone(),
            owner_org: dataset.owner_org.clone(),
            dataset_date: dataset.dataset_date.clone(),
            data_update_frequency: dataset.update_frequency.hdx_code(),
            subnational: if dataset.subnational { "1" } else { "0" },
            groups: vec![NameRef::new(&dataset.country_iso3.to_lowercase())],
            tags: dataset.tags.iter().map(|t| NameRef::new(t)).collect(),
            resources: dataset
                .resources
                .iter()
                .map(|r| HdxResource {
                    name: r.name.clone(),
                    url: r.url.clone(),
                    description: r.description.clone(),
                    format: r.format.clone(),
                    resource_type: "api",
                    url_type: "api",
                })
                .collect(),
        }
    }
}

/// Showcase payload for `ckanext_showcase_create` and `ckanext_showcase_update`.
#[derive(Serialize, Debug, Clone, PartialEq)]
struct HdxShowcase {
    name: String,
    title: String,
    notes: String,
    url: String,
    image_url: String,
    tags: Vec<NameRef>,
}

impl From<&ShowcaseDraft> for HdxShowcase {
    fn from(showcase: &ShowcaseDraft) -> Self {
        Self {
            name: showcase.name.clone(),
            title: showcase.title.clone(),
            notes: showcase.notes.clone(),
            url: showcase.url.clone(),
            image_url: showcase.image_url.clone(),
            tags: showcase.tags.iter().map(|t| NameRef::new(t)).collect(),
        }
    }
}

/// HDX catalog client, speaking the CKAN action API.
///
/// # Examples
///
/// ```no_run
/// use geonode_client::CkanCatalog;
/// use geonode_core::{CatalogStore, HttpConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = CkanCatalog::new(
///     "https://data.humdata.org",
///     Some("my-api-key"),
///     &HttpConfig::default(),
/// )?;
/// let records = catalog
///     .search_by_organization("3ecac442-7fed-448d-8f78-b385ef6f84e7")
///     .await?;
/// println!("Organisation has {} datasets", records.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CkanCatalog {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl CkanCatalog {
    /// Creates a catalog client for the CKAN site at `site_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the URL is invalid or malformed.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(site_url: &str, api_key: Option<&str>, http: &HttpConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(site_url)
            .map_err(|_| AppError::InvalidUrl(format!("Invalid CKAN URL: {}", site_url)))?;

        let client = Client::builder()
            .user_agent(http.user_agent.as_str())
            .timeout(http.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.map(str::to_string),
            timeout: http.timeout,
        })
    }

    fn action_url(&self, action: &str) -> Result<Url, AppError> {
        self.base_url
            .join(&format!("api/3/action/{}", action))
            .map_err(|e| AppError::InvalidUrl(e.to_string()))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", key),
            None => request,
        }
    }

    /// Sends an action request; `Ok(None)` when CKAN answers 404 Not Found.
    async fn send_action<T: DeserializeOwned>(
        &self,
        action: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>, AppError> {
        debug!("CKAN action {}", action);
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: CkanResponse<T> = resp.json().await.map_err(|e| {
            AppError::CatalogError(format!(
                "HTTP {} from {}: undecodable response: {}",
                status.as_u16(),
                action,
                e
            ))
        })?;

        if !status.is_success() || !body.success {
            let detail = body
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "success: false".to_string());
            return Err(AppError::CatalogError(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                action,
                detail
            )));
        }

        Ok(body.result)
    }

    async fn get_action<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>, AppError> {
        let mut url = self.action_url(action)?;
        url.query_pairs_mut().extend_pairs(params);
        self.send_action(action, self.client.get(url)).await
    }

    async fn post_action<B: Serialize>(&self, action: &str, body: &B) -> Result<Value, AppError> {
        let url = self.action_url(action)?;
        self.send_action::<Value>(action, self.client.post(url).json(body))
            .await?
            .ok_or_else(|| AppError::CatalogError(format!("HTTP 404 from {}", action)))
    }

    async fn publish_dataset(&self, dataset: &DatasetDraft) -> Result<(), AppError> {
        let payload = HdxPackage::from(dataset);
        let existing: Option<Value> = self
            .get_action("package_show", &[("id", dataset.name.as_str())])
            .await?;

        if existing.is_some() {
            self.post_action("package_update", &payload).await?;
            info!("Updated dataset {}", dataset.name);
        } else {
            self.post_action("package_create", &payload).await?;
            info!("Created dataset {}", dataset.name);
        }
        Ok(())
    }

    async fn publish_showcase(&self, showcase: &ShowcaseDraft) -> Result<(), AppError> {
        let payload = HdxShowcase::from(showcase);
        let existing: Option<Value> = self
            .get_action("ckanext_showcase_show", &[("id", showcase.name.as_str())])
            .await?;

        if existing.is_some() {
            self.post_action("ckanext_showcase_update", &payload).await?;
        } else {
            self.post_action("ckanext_showcase_create", &payload).await?;
        }
        Ok(())
    }

    async fn link_showcase(&self, dataset_name: &str, showcase_name: &str) -> Result<(), AppError> {
        let linked: Vec<CkanPackage> = self
            .get_action(
                "ckanext_showcase_package_list",
                &[("showcase_id", showcase_name)],
            )
            .await?
            .unwrap_or_default();

        if linked.iter().any(|p| p.name == dataset_name) {
            return Ok(());
        }
        self.post_action(
            "ckanext_showcase_package_association_create",
            &json!({"package_id": dataset_name, "showcase_id": showcase_name}),
        )
        .await?;
        Ok(())
    }
}

impl CatalogStore for CkanCatalog {
    async fn publish(&self, dataset: &DatasetDraft, showcase: &ShowcaseDraft) -> Result<(), AppError> {
        self.publish_dataset(dataset).await?;
        self.publish_showcase(showcase).await?;
        self.link_showcase(&dataset.name, &showcase.name).await
    }

    async fn search_by_organization(&self, org_id: &str) -> Result<Vec<PublishedRecord>, AppError> {
        let fq = format!("owner_org:{}", org_id);
        let rows = SEARCH_PAGE_SIZE.to_string();
        let mut records = Vec::new();

        loop {
            let start = records.len().to_string();
            let page: SearchResult = self
                .get_action(
                    "package_search",
                    &[("fq", fq.as_str()), ("rows", rows.as_str()), ("start", start.as_str())],
                )
                .await?
                .ok_or_else(|| AppError::CatalogError("HTTP 404 from package_search".to_string()))?;

            let fetched = page.results.len();
            records.extend(page.results.into_iter().map(CkanPackage::into_published_record));
            if fetched == 0 || records.len() >= page.count {
                break;
            }
        }

        debug!("{} datasets owned by {}", records.len(), org_id);
        Ok(records)
    }

    async fn remove(&self, record: &PublishedRecord) -> Result<(), AppError> {
        self.post_action("package_delete", &json!({"id": record.name}))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geonode_core::models::{ResourceDraft, UpdateFrequency};

    fn draft() -> DatasetDraft {
        DatasetDraft {
            name: "wfp-geonode-sdn-ica-landdegradation-geonode".to_string(),
            title: "ICA Sudan, 2018 - Land Degradation, 2001-2013".to_string(),
            notes: "This layer contains...".to_string(),
            maintainer: "d7a13725-5cb5-48f4-87ac-a70b5cea531e".to_string(),
            owner_org: "3ecac442-7fed-448d-8f78-b385ef6f84e7".to_string(),
            dataset_date: "11/22/2018".to_string(),
            update_frequency: UpdateFrequency::AsNeeded,
            subnational: true,
            country_iso3: "SDN".to_string(),
            resources: vec![ResourceDraft {
                name: "ICA Sudan, 2018 - Land Degradation, 2001-2013 shapefile".to_string(),
                url: "http://xxx/geoserver/wfs?outputFormat=SHAPE-ZIP".to_string(),
                description: "Zipped Shapefile. This layer contains...".to_string(),
                format: "zipped shapefile".to_string(),
            }],
            tags: vec!["geodata".to_string(), "land use and land cover".to_string()],
        }
    }

    #[test]
    fn test_new_with_valid_url() {
        let catalog =
            CkanCatalog::new("https://data.humdata.org", None, &HttpConfig::default()).unwrap();
        assert_eq!(catalog.base_url.as_str(), "https://data.humdata.org/");
        assert!(catalog.api_key.is_none());
    }

    #[test]
    fn test_new_with_invalid_url() {
        let result = CkanCatalog::new("not-a-valid-url", None, &HttpConfig::default());
        if let Err(AppError::InvalidUrl(msg)) = result {
            assert!(msg.contains("Invalid CKAN URL"));
        } else {
            panic!("Expected AppError::InvalidUrl");
        }
    }

    #[test]
    fn test_action_url() {
        let catalog =
            CkanCatalog::new("https://data.humdata.org", None, &HttpConfig::default()).unwrap();
        assert_eq!(
            catalog.action_url("package_search").unwrap().as_str(),
            "https://data.humdata.org/api/3/action/package_search"
        );
    }

    #[test]
    fn test_package_payload_shape() {
        let payload = serde_json::to_value(HdxPackage::from(&draft())).unwrap();
        assert_eq!(
            payload,
            json!({
                "name": "wfp-geonode-sdn-ica-landdegradation-geonode",
                "title": "ICA Sudan, 2018 - Land Degradation, 2001-2013",
                "notes": "This layer contains...",
                "maintainer": "d7a13725-5cb5-48f4-87ac-a70b5cea531e",
                "owner_org": "3ecac442-7fed-448d-8f78-b385ef6f84e7",
                "dataset_date": "11/22/2018",
                "data_update_frequency": "-2",
                "subnational": "1",
                "groups": [{"name": "sdn"}],
                "tags": [{"name": "geodata"}, {"name": "land use and land cover"}],
                "resources": [{
                    "name": "ICA Sudan, 2018 - Land Degradation, 2001-2013 shapefile",
                    "url": "http://xxx/geoserver/wfs?outputFormat=SHAPE-ZIP",
                    "description": "Zipped Shapefile. This layer contains...",
                    "format": "zipped shapefile",
                    "resource_type": "api",
                    "url_type": "api"
                }]
            })
        );
    }

    #[test]
    fn test_package_payload_national() {
        let mut dataset = draft();
        dataset.subnational = false;
        dataset.update_frequency = UpdateFrequency::Weekly;
        let payload = HdxPackage::from(&dataset);
        assert_eq!(payload.subnational, "0");
        assert_eq!(payload.data_update_frequency, "7");
    }

    #[test]
    fn test_showcase_payload_shape() {
        let showcase = ShowcaseDraft {
            name: "wfp-geonode-sdn-roads-showcase".to_string(),
            title: "Sudan roads".to_string(),
            notes: "Roads".to_string(),
            url: "http://xxx/layers/geonode%3Asdn_roads".to_string(),
            image_url: "http://xxx/thumb.png".to_string(),
            tags: vec!["geodata".to_string()],
        };
        let payload = serde_json::to_value(HdxShowcase::from(&showcase)).unwrap();
        assert_eq!(payload["url"], json!("http://xxx/layers/geonode%3Asdn_roads"));
        assert_eq!(payload["image_url"], json!("http://xxx/thumb.png"));
        assert_eq!(payload["tags"], json!([{"name": "geodata"}]));
    }

    #[test]
    fn test_ckan_error_response_deserialization() {
        let json = r#"{
            "success": false,
            "error": {"message": "Access denied", "__type": "Authorization Error"}
        }"#;

        let response: CkanResponse<Value> = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert!(response.result.is_none());
        assert!(response.error.unwrap().to_string().contains("Authorization Error"));
    }

    #[test]
    fn test_search_result_deserialization() {
        let json = r#"{
            "count": 2,
            "results": [
                {"name": "a", "title": "A", "maintainer": "m", "owner_org": "o",
                 "resources": [{"url": "http://xxx/1"}, {"url": "http://xxx/2"}]},
                {"name": "b", "title": "B", "resources": []}
            ]
        }"#;

        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.count, 2);
        let records: Vec<_> = result
            .results
            .into_iter()
            .map(CkanPackage::into_published_record)
            .collect();
        assert_eq!(records[0].resource_urls, ["http://xxx/1", "http://xxx/2"]);
        assert_eq!(records[1].maintainer, None);
        assert_eq!(records[1].primary_resource_url(), None);
    }
}

//! Records flowing through a harvest: what GeoNode returns, what gets
//! published to HDX, and what HDX already holds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AppError;

/// Envelope of GeoNode list endpoints (`/api/regions`, `/api/layers`).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiList<T> {
    pub objects: Vec<T>,
}

/// A region as listed by GeoNode's `/api/regions`.
///
/// Regions are not necessarily countries: GeoNode also lists continents and
/// groupings such as "Southern Africa".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Region code, an ISO3 code for countries
    pub code: String,
    /// English display name
    #[serde(default)]
    pub name_en: String,
    /// Number of layers tagged with this region; missing or null on some servers
    #[serde(default)]
    pub count: Option<u64>,
    /// All other fields returned by GeoNode
    #[serde(flatten)]
    pub extras: serde_json::Map<String, Value>,
}

/// A country to harvest layers for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryDescriptor {
    pub iso3: String,
    pub name: String,
    /// Region code used to filter layers; `None` fetches every layer on the server.
    pub layers: Option<String>,
}

impl CountryDescriptor {
    /// Descriptor filtering layers by the country's own code.
    pub fn new(iso3: &str, name: &str) -> Self {
        Self {
            iso3: iso3.to_string(),
            name: name.to_string(),
            layers: Some(iso3.to_string()),
        }
    }

    /// Descriptor for a server that only holds data for one country.
    pub fn unfiltered(iso3: &str, name: &str) -> Self {
        Self {
            iso3: iso3.to_string(),
            name: name.to_string(),
            layers: None,
        }
    }
}

/// A layer as listed by GeoNode's `/api/layers`.
///
/// Only the fields the harvester reads are typed; everything else is kept in
/// `extras` so the record round-trips unchanged.
///
/// # Examples
///
/// ```
/// use geonode_core::RawLayer;
///
/// let json = r#"{
///     "title": "Myanmar Town 2019 July",
///     "abstract": "Towns are urban areas divided into wards.",
///     "detail_url": "/layers/geonode%3Ammr_town_2019_july",
///     "supplemental_information": "Place name from GAD",
///     "date": "2019-08-05T22:06:00",
///     "srid": "EPSG:4326",
///     "category__gn_description": "Location",
///     "thumbnail_url": "http://geonode.themimu.info/thumb.png",
///     "id": 211
/// }"#;
///
/// let layer: RawLayer = serde_json::from_str(json).unwrap();
/// assert_eq!(layer.category_description.as_deref(), Some("Location"));
/// assert!(layer.extras.contains_key("id"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLayer {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Path of the layer page, e.g. `/layers/geonode%3Asdn_roads`
    pub detail_url: String,
    #[serde(default)]
    pub supplemental_information: Option<String>,
    pub date: String,
    pub srid: String,
    #[serde(rename = "category__gn_description", default)]
    pub category_description: Option<String>,
    pub thumbnail_url: String,
    #[serde(flatten)]
    pub extras: serde_json::Map<String, Value>,
}

/// Outcome of running the rule set over one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The abstract contains an ignore term; the layer is not published.
    Rejected { term: String },
    /// The layer is published with these tags, `"geodata"` first.
    Accepted { tags: Vec<String> },
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accepted { .. })
    }

    pub fn tags(&self) -> Option<&[String]> {
        match self {
            Classification::Accepted { tags } => Some(tags),
            Classification::Rejected { .. } => None,
        }
    }
}

/// How often HDX should expect a dataset to be updated.
///
/// Parsing accepts the HDX labels, common aliases and the numeric codes
/// HDX stores in `data_update_frequency`.
///
/// ```
/// use geonode_core::UpdateFrequency;
///
/// let freq: UpdateFrequency = "Adhoc".parse().unwrap();
/// assert_eq!(freq, UpdateFrequency::AsNeeded);
/// assert_eq!(freq.hdx_code(), "-2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum UpdateFrequency {
    Live,
    Daily,
    Weekly,
    Fortnightly,
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
    Never,
    #[default]
    AsNeeded,
}

impl UpdateFrequency {
    /// Value of the HDX `data_update_frequency` field.
    pub fn hdx_code(&self) -> &'static str {
        match self {
            UpdateFrequency::Live => "0",
            UpdateFrequency::Daily => "1",
            UpdateFrequency::Weekly => "7",
            UpdateFrequency::Fortnightly => "14",
            UpdateFrequency::Monthly => "30",
            UpdateFrequency::Quarterly => "90",
            UpdateFrequency::SemiAnnually => "180",
            UpdateFrequency::Annually => "365",
            UpdateFrequency::Never => "-1",
            UpdateFrequency::AsNeeded => "-2",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UpdateFrequency::Live => "Live",
            UpdateFrequency::Daily => "Every day",
            UpdateFrequency::Weekly => "Every week",
            UpdateFrequency::Fortnightly => "Every two weeks",
            UpdateFrequency::Monthly => "Every month",
            UpdateFrequency::Quarterly => "Every three months",
            UpdateFrequency::SemiAnnually => "Every six months",
            UpdateFrequency::Annually => "Every year",
            UpdateFrequency::Never => "Never",
            UpdateFrequency::AsNeeded => "As needed",
        }
    }
}

impl fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UpdateFrequency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let freq = match normalized.as_str() {
            "live" | "0" => UpdateFrequency::Live,
            "every day" | "daily" | "1" => UpdateFrequency::Daily,
            "every week" | "weekly" | "7" => UpdateFrequency::Weekly,
            "every two weeks" | "fortnightly" | "14" => UpdateFrequency::Fortnightly,
            "every month" | "monthly" | "30" => UpdateFrequency::Monthly,
            "every three months" | "quarterly" | "90" => UpdateFrequency::Quarterly,
            "every six months" | "semiannually" | "180" => UpdateFrequency::SemiAnnually,
            "every year" | "annually" | "yearly" | "365" => UpdateFrequency::Annually,
            "never" | "-1" => UpdateFrequency::Never,
            "as needed" | "adhoc" | "ad hoc" | "-2" => UpdateFrequency::AsNeeded,
            _ => {
                return Err(AppError::ConfigError(format!(
                    "unknown update frequency '{}'",
                    s
                )))
            }
        };
        Ok(freq)
    }
}

impl From<UpdateFrequency> for String {
    fn from(freq: UpdateFrequency) -> Self {
        freq.label().to_string()
    }
}

impl TryFrom<String> for UpdateFrequency {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A downloadable file attached to a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDraft {
    pub name: String,
    pub url: String,
    pub description: String,
    pub format: String,
}

/// Dataset about to be created or updated on HDX.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDraft {
    /// URL slug, unique on HDX
    pub name: String,
    pub title: String,
    pub notes: String,
    pub maintainer: String,
    pub owner_org: String,
    /// `MM/DD/YYYY` when the layer date could be parsed, the raw value otherwise
    pub dataset_date: String,
    pub update_frequency: UpdateFrequency,
    pub subnational: bool,
    /// ISO3 code of the country location
    pub country_iso3: String,
    pub resources: Vec<ResourceDraft>,
    pub tags: Vec<String>,
}

/// Showcase linking an HDX dataset back to its GeoNode layer page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowcaseDraft {
    pub name: String,
    pub title: String,
    pub notes: String,
    pub url: String,
    pub image_url: String,
    pub tags: Vec<String>,
}

/// A dataset and its showcase, generated from one accepted layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishableRecord {
    pub dataset: DatasetDraft,
    pub showcase: ShowcaseDraft,
}

/// A dataset already present in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRecord {
    pub name: String,
    pub title: String,
    pub maintainer: Option<String>,
    pub owner_org: Option<String>,
    /// Resource URLs in catalog order
    pub resource_urls: Vec<String>,
}

impl PublishedRecord {
    /// URL of the first resource, used to tell which GeoNode server the
    /// dataset came from.
    pub fn primary_resource_url(&self) -> Option<&str> {
        self.resource_urls.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_region_record_null_and_missing_count() {
        let regions: ApiList<RegionRecord> = serde_json::from_value(json!({
            "objects": [
                {"code": "YEM", "count": null, "name": "Yemen", "name_en": "Yemen"},
                {"code": "GLO", "name_en": "Global"},
                {"code": "SDN", "count": 33, "name_en": "Sudan", "id": 218}
            ]
        }))
        .unwrap();

        assert_eq!(regions.objects[0].count, None);
        assert_eq!(regions.objects[1].count, None);
        assert_eq!(regions.objects[2].count, Some(33));
        assert_eq!(regions.objects[2].extras["id"], json!(218));
    }

    #[test]
    fn test_raw_layer_keeps_unknown_fields() {
        let value = json!({
            "abstract": "This layer contains...",
            "category__gn_description": null,
            "csw_type": "dataset",
            "date": "2018-11-22T16:56:00",
            "detail_url": "/layers/geonode%3Asdn_roads",
            "srid": "EPSG:4326",
            "supplemental_information": "No information provided",
            "thumbnail_url": "https://geonode.wfp.org/thumb.png",
            "title": "Sudan roads"
        });
        let layer: RawLayer = serde_json::from_value(value.clone()).unwrap();

        assert!(layer.category_description.is_none());
        assert_eq!(layer.extras["csw_type"], json!("dataset"));
        assert_eq!(serde_json::to_value(&layer).unwrap(), value);
    }

    #[test]
    fn test_raw_layer_without_supplemental_information() {
        let layer: RawLayer = serde_json::from_value(json!({
            "abstract": "a",
            "date": "2019-01-01",
            "detail_url": "/layers/x",
            "srid": "EPSG:4326",
            "thumbnail_url": "t",
            "title": "T"
        }))
        .unwrap();
        assert!(layer.supplemental_information.is_none());
        assert!(layer.category_description.is_none());
    }

    #[test]
    fn test_update_frequency_parsing() {
        assert_eq!(
            "Adhoc".parse::<UpdateFrequency>().unwrap(),
            UpdateFrequency::AsNeeded
        );
        assert_eq!(
            "every week".parse::<UpdateFrequency>().unwrap(),
            UpdateFrequency::Weekly
        );
        assert_eq!(
            "365".parse::<UpdateFrequency>().unwrap(),
            UpdateFrequency::Annually
        );
        assert!("sometimes".parse::<UpdateFrequency>().is_err());
    }

    #[test]
    fn test_update_frequency_serde_uses_label() {
        let json = serde_json::to_value(UpdateFrequency::Monthly).unwrap();
        assert_eq!(json, json!("Every month"));
        let back: UpdateFrequency = serde_json::from_value(json!("quarterly")).unwrap();
        assert_eq!(back, UpdateFrequency::Quarterly);
        assert_eq!(UpdateFrequency::default().hdx_code(), "-2");
    }

    #[test]
    fn test_primary_resource_url() {
        let record = PublishedRecord {
            name: "a".to_string(),
            title: "A".to_string(),
            maintainer: None,
            owner_org: None,
            resource_urls: vec!["http://one".to_string(), "http://two".to_string()],
        };
        assert_eq!(record.primary_resource_url(), Some("http://one"));

        let empty = PublishedRecord {
            resource_urls: Vec::new(),
            ..record
        };
        assert_eq!(empty.primary_resource_url(), None);
    }

    #[test]
    fn test_classification_accessors() {
        let accepted = Classification::Accepted {
            tags: vec!["geodata".to_string()],
        };
        assert!(accepted.is_accepted());
        assert_eq!(accepted.tags().unwrap(), ["geodata".to_string()]);

        let rejected = Classification::Rejected {
            term: "deprecated".to_string(),
        };
        assert!(!rejected.is_accepted());
        assert!(rejected.tags().is_none());
    }
}

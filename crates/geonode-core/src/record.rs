//! Builds the HDX dataset and showcase for an accepted GeoNode layer.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use deunicode::deunicode_with_tofu;
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::models::{
    Classification, DatasetDraft, PublishableRecord, RawLayer, ResourceDraft, ShowcaseDraft,
    UpdateFrequency,
};

/// Supplemental information starting with this (any case) is not added to the notes.
const NO_INFO_PREFIX: &str = "no info";

const SHAPEFILE_FORMAT: &str = "zipped shapefile";
const GEOJSON_FORMAT: &str = "GeoJSON";

/// Organisation-level settings stamped on every generated dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub maintainer_id: String,
    pub org_id: String,
    /// Prefix of every dataset slug
    pub org_name: String,
    pub update_frequency: UpdateFrequency,
    pub subnational: bool,
}

impl PublishOptions {
    /// Options with the defaults: update frequency "As needed", subnational.
    pub fn new(maintainer_id: &str, org_id: &str, org_name: &str) -> Self {
        Self {
            maintainer_id: maintainer_id.to_string(),
            org_id: org_id.to_string(),
            org_name: org_name.to_string(),
            update_frequency: UpdateFrequency::default(),
            subnational: true,
        }
    }

    pub fn with_update_frequency(mut self, update_frequency: UpdateFrequency) -> Self {
        self.update_frequency = update_frequency;
        self
    }

    pub fn with_subnational(mut self, subnational: bool) -> Self {
        self.subnational = subnational;
        self
    }
}

/// Builds the dataset and showcase for a layer.
///
/// Returns `None` when the layer was rejected. Malformed input never fails:
/// odd slugs, dates or URLs are carried over as they are.
///
/// # Arguments
///
/// * `geonode_url` - Base URL of the GeoNode server, without trailing slash
/// * `country_iso` - ISO3 code of the dataset's country location
/// * `layer` - The layer as returned by GeoNode
/// * `classification` - Result of [`classify`](crate::classify) for this layer
/// * `options` - Organisation-level settings
pub fn build_record(
    geonode_url: &str,
    country_iso: &str,
    layer: &RawLayer,
    classification: &Classification,
    options: &PublishOptions,
) -> Option<PublishableRecord> {
    let tags = classification.tags()?.to_vec();

    let type_name = type_name(&layer.detail_url);
    let name = dataset_slug(&options.org_name, type_name);
    let title = layer.title.clone();
    let summary = layer.abstract_text.as_str();

    let srid: String = form_urlencoded::byte_serialize(layer.srid.as_bytes()).collect();
    let resources = vec![
        ResourceDraft {
            name: format!("{} shapefile", title),
            url: format!(
                "{}/geoserver/wfs?format_options=charset:UTF-8&typename={}&outputFormat=SHAPE-ZIP&version=1.0.0&service=WFS&request=GetFeature",
                geonode_url, type_name
            ),
            description: format!("Zipped Shapefile. {}", summary),
            format: SHAPEFILE_FORMAT.to_string(),
        },
        ResourceDraft {
            name: format!("{} geojson", title),
            url: format!(
                "{}/geoserver/wfs?srsName={}&typename={}&outputFormat=json&version=1.0.0&service=WFS&request=GetFeature",
                geonode_url, srid, type_name
            ),
            description: format!("GeoJSON file. {}", summary),
            format: GEOJSON_FORMAT.to_string(),
        },
    ];

    let showcase = ShowcaseDraft {
        name: format!("{}-showcase", name),
        title: title.clone(),
        notes: summary.to_string(),
        url: format!("{}{}", geonode_url, layer.detail_url),
        image_url: layer.thumbnail_url.clone(),
        tags: tags.clone(),
    };

    let dataset = DatasetDraft {
        name,
        title,
        notes: dataset_notes(summary, layer.supplemental_information.as_deref()),
        maintainer: options.maintainer_id.clone(),
        owner_org: options.org_id.clone(),
        dataset_date: dataset_date(&layer.date),
        update_frequency: options.update_frequency,
        subnational: options.subnational,
        country_iso3: country_iso.to_string(),
        resources,
        tags,
    };

    Some(PublishableRecord { dataset, showcase })
}

/// Last path segment of a layer detail URL, e.g. `geonode%3Asdn_roads`.
pub fn type_name(detail_url: &str) -> &str {
    detail_url.rsplit('/').next().unwrap_or(detail_url)
}

/// Slug for a layer: `{org}_{typename}` unescaped and slugified, with a
/// trailing `-YYYYMMDD` removed.
///
/// ```
/// use geonode_core::record::dataset_slug;
///
/// assert_eq!(
///     dataset_slug("WFP", "geonode%3Asdn_ica_predlhz_geonode_20180201"),
///     "wfp-geonode-sdn-ica-predlhz-geonode"
/// );
/// ```
pub fn dataset_slug(org_name: &str, type_name: &str) -> String {
    let raw = format!("{}_{}", org_name, type_name).replace('+', " ");
    let unescaped = percent_decode_str(&raw).decode_utf8_lossy();
    strip_date_suffix(slugify(&unescaped))
}

/// Lowercase ASCII slug.
///
/// Non-ASCII text is transliterated first (`é` becomes `e`). An ASCII `'`
/// separates words, while typographic apostrophes are dropped. Commas between
/// digits are removed. Every other run of non-alphanumeric characters becomes
/// one `-`, with no leading or trailing `-`.
pub fn slugify(s: &str) -> String {
    // Apostrophes left after transliteration came from typographic quotes.
    let ascii = deunicode_with_tofu(&s.replace('\'', "-"), "").replace('\'', "");
    let chars: Vec<char> = ascii.chars().collect();
    let between_digits = |i: usize| {
        i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
    };

    let mut result = String::with_capacity(chars.len());
    let mut pending_separator = false;

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !result.is_empty() {
                result.push('-');
            }
            result.push(c.to_ascii_lowercase());
            pending_separator = false;
        } else if !(c == ',' && between_digits(i)) {
            pending_separator = true;
        }
    }

    result
}

/// Removes a `-YYYYMMDD` suffix when it is a valid calendar date.
fn strip_date_suffix(slug: String) -> String {
    const DATE_LEN: usize = 8;

    if slug.len() <= DATE_LEN || !slug.is_ascii() {
        return slug;
    }
    let split = slug.len() - DATE_LEN;
    let (head, suffix) = slug.split_at(split);

    let is_date = suffix.bytes().all(|b| b.is_ascii_digit())
        && NaiveDate::parse_from_str(suffix, "%Y%m%d").is_ok();
    if is_date && head.ends_with('-') {
        return head[..head.len() - 1].to_string();
    }
    slug
}

/// Abstract plus supplemental information, unless the latter is blank or
/// says there is no information.
fn dataset_notes(summary: &str, supplemental: Option<&str>) -> String {
    match supplemental {
        Some(info)
            if !info.trim().is_empty() && !info.to_lowercase().starts_with(NO_INFO_PREFIX) =>
        {
            format!("{}\n\n{}", summary, info)
        }
        _ => summary.to_string(),
    }
}

/// Reformats a GeoNode date as HDX's `MM/DD/YYYY`; unparseable values are kept.
fn dataset_date(raw: &str) -> String {
    const HDX_FORMAT: &str = "%m/%d/%Y";

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(HDX_FORMAT).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format(HDX_FORMAT).to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format(HDX_FORMAT).to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WFP_MAINTAINER: &str = "d7a13725-5cb5-48f4-87ac-a70b5cea531e";
    const WFP_ORG: &str = "3ecac442-7fed-448d-8f78-b385ef6f84e7";

    fn wfp_layer() -> RawLayer {
        serde_json::from_value(json!({
            "abstract": "This layer contains...",
            "category__gn_description": "Physical Features, Land Cover, Land Use, DEM",
            "csw_type": "dataset",
            "date": "2018-11-22T16:56:00",
            "detail_url": "/layers/geonode%3Asdn_ica_landdegradation_geonode_20180201",
            "id": 9110,
            "srid": "EPSG:4326",
            "supplemental_information": "No information provided",
            "thumbnail_url": "https://geonode.wfp.org/uploaded/thumbs/layer-3c418668-thumb.png",
            "title": "ICA Sudan, 2018 - Land Degradation, 2001-2013"
        }))
        .unwrap()
    }

    fn accepted() -> Classification {
        Classification::Accepted {
            tags: vec![
                "geodata".to_string(),
                "land use and land cover".to_string(),
            ],
        }
    }

    #[test]
    fn test_build_record_dataset() {
        let options = PublishOptions::new(WFP_MAINTAINER, WFP_ORG, "WFP");
        let record =
            build_record("http://xxx", "SDN", &wfp_layer(), &accepted(), &options).unwrap();
        let dataset = record.dataset;

        assert_eq!(dataset.name, "wfp-geonode-sdn-ica-landdegradation-geonode");
        assert_eq!(dataset.title, "ICA Sudan, 2018 - Land Degradation, 2001-2013");
        assert_eq!(dataset.notes, "This layer contains...");
        assert_eq!(dataset.maintainer, WFP_MAINTAINER);
        assert_eq!(dataset.owner_org, WFP_ORG);
        assert_eq!(dataset.dataset_date, "11/22/2018");
        assert_eq!(dataset.update_frequency, UpdateFrequency::AsNeeded);
        assert!(dataset.subnational);
        assert_eq!(dataset.country_iso3, "SDN");
        assert_eq!(dataset.tags, ["geodata", "land use and land cover"]);
    }

    #[test]
    fn test_build_record_resources() {
        let options = PublishOptions::new(WFP_MAINTAINER, WFP_ORG, "WFP");
        let record =
            build_record("http://xxx", "SDN", &wfp_layer(), &accepted(), &options).unwrap();

        assert_eq!(
            record.dataset.resources,
            vec![
                ResourceDraft {
                    name: "ICA Sudan, 2018 - Land Degradation, 2001-2013 shapefile".to_string(),
                    url: "http://xxx/geoserver/wfs?format_options=charset:UTF-8&typename=geonode%3Asdn_ica_landdegradation_geonode_20180201&outputFormat=SHAPE-ZIP&version=1.0.0&service=WFS&request=GetFeature".to_string(),
                    description: "Zipped Shapefile. This layer contains...".to_string(),
                    format: "zipped shapefile".to_string(),
                },
                ResourceDraft {
                    name: "ICA Sudan, 2018 - Land Degradation, 2001-2013 geojson".to_string(),
                    url: "http://xxx/geoserver/wfs?srsName=EPSG%3A4326&typename=geonode%3Asdn_ica_landdegradation_geonode_20180201&outputFormat=json&version=1.0.0&service=WFS&request=GetFeature".to_string(),
                    description: "GeoJSON file. This layer contains...".to_string(),
                    format: "GeoJSON".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_build_record_showcase() {
        let options = PublishOptions::new(WFP_MAINTAINER, WFP_ORG, "WFP");
        let record =
            build_record("http://xxx", "SDN", &wfp_layer(), &accepted(), &options).unwrap();
        let showcase = record.showcase;

        assert_eq!(
            showcase.name,
            "wfp-geonode-sdn-ica-landdegradation-geonode-showcase"
        );
        assert_eq!(
            showcase.url,
            "http://xxx/layers/geonode%3Asdn_ica_landdegradation_geonode_20180201"
        );
        assert_eq!(
            showcase.image_url,
            "https://geonode.wfp.org/uploaded/thumbs/layer-3c418668-thumb.png"
        );
        assert_eq!(showcase.notes, "This layer contains...");
        assert_eq!(showcase.tags, record.dataset.tags);
    }

    #[test]
    fn test_rejected_layer_builds_nothing() {
        let options = PublishOptions::new(WFP_MAINTAINER, WFP_ORG, "WFP");
        let rejected = Classification::Rejected {
            term: "deprecated".to_string(),
        };
        assert!(build_record("http://xxx", "SDN", &wfp_layer(), &rejected, &options).is_none());
    }

    #[test]
    fn test_supplemental_information_in_dataset_notes_only() {
        let mut layer = wfp_layer();
        layer.supplemental_information = Some("LAND COVER CLASSES".to_string());
        let options = PublishOptions::new(WFP_MAINTAINER, WFP_ORG, "WFP");
        let record = build_record("http://xxx", "SDN", &layer, &accepted(), &options).unwrap();

        assert_eq!(
            record.dataset.notes,
            "This layer contains...\n\nLAND COVER CLASSES"
        );
        assert_eq!(record.showcase.notes, "This layer contains...");
    }

    #[test]
    fn test_dataset_notes_variants() {
        assert_eq!(dataset_notes("abc", Some("NO INFO here")), "abc");
        assert_eq!(dataset_notes("abc", Some("no information provided")), "abc");
        assert_eq!(dataset_notes("abc", Some("   ")), "abc");
        assert_eq!(dataset_notes("abc", None), "abc");
        assert_eq!(dataset_notes("abc", Some("Notes")), "abc\n\nNotes");
    }

    #[test]
    fn test_dataset_notes_keep_supplemental_verbatim() {
        assert_eq!(dataset_notes("abc", Some(" no info")), "abc\n\n no info");
        assert_eq!(dataset_notes("abc", Some("Notes \n")), "abc\n\nNotes \n");
    }

    #[test]
    fn test_options_are_applied() {
        let options = PublishOptions::new(WFP_MAINTAINER, WFP_ORG, "WFP")
            .with_update_frequency(UpdateFrequency::Monthly)
            .with_subnational(false);
        let record =
            build_record("http://xxx", "SDN", &wfp_layer(), &accepted(), &options).unwrap();
        assert_eq!(record.dataset.update_frequency, UpdateFrequency::Monthly);
        assert!(!record.dataset.subnational);
    }

    #[test]
    fn test_slug_without_date() {
        assert_eq!(
            dataset_slug("MIMU", "geonode%3Ammr_town_2019_july"),
            "mimu-geonode-mmr-town-2019-july"
        );
    }

    #[test]
    fn test_slug_date_suffix_needs_separator() {
        assert_eq!(dataset_slug("WFP", "roads-20190805"), "wfp-roads");
        assert_eq!(dataset_slug("WFP", "roadsX20190805"), "wfp-roadsx20190805");
    }

    #[test]
    fn test_slug_keeps_invalid_dates() {
        assert_eq!(dataset_slug("WFP", "roads_20191399"), "wfp-roads-20191399");
        assert_eq!(dataset_slug("WFP", "dec2015"), "wfp-dec2015");
    }

    #[test]
    fn test_strip_date_suffix_short_slugs() {
        assert_eq!(strip_date_suffix("20190805".to_string()), "20190805");
        assert_eq!(strip_date_suffix("-20190805".to_string()), "");
        assert_eq!(strip_date_suffix(String::new()), "");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("__WFP geonode:Roads__"), "wfp-geonode-roads");
        assert_eq!(slugify("a+b"), "a-b");
        assert_eq!(slugify("\"Quoted\" title"), "quoted-title");
    }

    #[test]
    fn test_slugify_apostrophes() {
        assert_eq!(slugify("Myanmar's forest"), "myanmar-s-forest");
        assert_eq!(slugify("Myanmar’s forest cover"), "myanmars-forest-cover");
    }

    #[test]
    fn test_slugify_transliterates() {
        assert_eq!(slugify("Réseau routier"), "reseau-routier");
        assert_eq!(slugify("Zones côtières"), "zones-cotieres");
    }

    #[test]
    fn test_slugify_digit_commas() {
        assert_eq!(slugify("pop 1,000,000"), "pop-1000000");
        assert_eq!(slugify("roads, rivers"), "roads-rivers");
        assert_eq!(slugify("1, 2"), "1-2");
        assert_eq!(slugify(",1"), "1");
    }

    #[test]
    fn test_slug_of_escaped_type_names() {
        assert_eq!(
            dataset_slug("WFP", "geonode%3Awomen%27s_centres"),
            "wfp-geonode-women-s-centres"
        );
        assert_eq!(dataset_slug("WFP", "myanmar%E2%80%99s_forest"), "wfp-myanmars-forest");
        assert_eq!(dataset_slug("OCHA", "R%C3%A9seau_routier"), "ocha-reseau-routier");
        assert_eq!(dataset_slug("WFP", "pop_1%2C000"), "wfp-pop-1000");
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name("/layers/geonode%3Asdn_roads"), "geonode%3Asdn_roads");
        assert_eq!(type_name("sdn_roads"), "sdn_roads");
    }

    #[test]
    fn test_dataset_date_formats() {
        assert_eq!(dataset_date("2019-08-05T22:06:00"), "08/05/2019");
        assert_eq!(dataset_date("2019-02-12T11:12:00.123456"), "02/12/2019");
        assert_eq!(dataset_date("2019-02-12T11:12:00Z"), "02/12/2019");
        assert_eq!(dataset_date("2019-02-12"), "02/12/2019");
        assert_eq!(dataset_date("last spring"), "last spring");
    }
}

//! Layer classification: publish-or-skip decision and HDX tags.

use crate::models::{Classification, RawLayer};
use crate::rules::RuleSet;

/// Tag every published GeoNode layer receives first.
pub const GEODATA_TAG: &str = "geodata";

/// Runs the rule set over one layer.
///
/// 1. A layer whose lowercased abstract contains an ignore term is rejected.
/// 2. Tags start with `"geodata"`, followed by the (mapped) category.
/// 3. Every title/abstract trigger found in the lowercased
///    `"{title} {abstract}"` contributes its tags, in mapping order.
///
/// Tags are not deduplicated.
///
/// ```
/// use geonode_core::{classify, Classification, RawLayer, RuleSet};
///
/// let rules = RuleSet::builtin(None).unwrap();
/// let layer: RawLayer = serde_json::from_value(serde_json::json!({
///     "title": "Sudan bridges",
///     "abstract": "Bridges over the Nile",
///     "detail_url": "/layers/geonode%3Asdn_bridges",
///     "date": "2019-01-01",
///     "srid": "EPSG:4326",
///     "category__gn_description": null,
///     "thumbnail_url": ""
/// })).unwrap();
///
/// let Classification::Accepted { tags } = classify(&layer, &rules) else {
///     panic!("layer should be accepted");
/// };
/// assert_eq!(tags, ["geodata", "bridges", "transportation", "facilities and infrastructure"]);
/// ```
pub fn classify(layer: &RawLayer, rules: &RuleSet) -> Classification {
    let abstract_lower = layer.abstract_text.to_lowercase();
    if let Some(term) = rules.matching_ignore_term(&abstract_lower) {
        return Classification::Rejected {
            term: term.to_string(),
        };
    }

    let mut tags = vec![GEODATA_TAG.to_string()];

    if let Some(category) = layer.category_description.as_deref() {
        tags.push(rules.category_tag(category).to_string());
    }

    let combined = format!("{} {}", layer.title, layer.abstract_text).to_lowercase();
    for (trigger, rule) in rules.title_abstract_mapping() {
        if combined.contains(trigger.as_str()) {
            rule.apply(&combined, &mut tags);
        }
    }

    Classification::Accepted { tags }
}

//! Rule store for layer classification.
//!
//! A [`RuleSet`] holds three maps read from YAML:
//!
//! - `ignore_terms`: lowercase substrings that veto publishing a layer when
//!   found in its abstract
//! - `category_mapping`: GeoNode category label → HDX tag
//! - `title_abstract_mapping`: lowercase trigger → [`TagRule`]
//!
//! A base file is merged with an optional override file once, at load time.
//! Each top-level key present in the override replaces the base key whole;
//! nothing is merged recursively.
//!
//! ```
//! use geonode_core::RuleSet;
//!
//! let mut rules = RuleSet::from_yaml(r#"
//! ignore_terms: [deprecated]
//! category_mapping:
//!   Location: populated places - settlements
//! title_abstract_mapping:
//!   idp:
//!     camp: [displaced persons locations - camps - shelters]
//!     else: [internally displaced persons - idp]
//! "#).unwrap();
//!
//! rules.merge_yaml("ignore_terms: [abcd]").unwrap();
//! assert_eq!(rules.ignore_terms(), ["abcd".to_string()]);
//! assert!(rules.category_mapping().contains_key("Location"));
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AppError;

/// Rules bundled with the library, used when no base file is given.
pub const BASE_RULES: &str = include_str!("../rules/base_rules.yml");

/// Reserved sub-key of a conditional rule holding its fallback tags.
pub const ELSE_KEY: &str = "else";

/// Shape of a title/abstract rule as written in YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawTagRule {
    Tags(Vec<String>),
    Branches(IndexMap<String, Vec<String>>),
}

/// Tags contributed by one title/abstract trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTagRule", into = "RawTagRule")]
pub enum TagRule {
    /// Tags added whenever the trigger matches.
    Flat(Vec<String>),
    /// Tags chosen by sub-triggers. `otherwise` is added only when no
    /// branch matched.
    Conditional {
        branches: IndexMap<String, Vec<String>>,
        otherwise: Option<Vec<String>>,
    },
}

impl TagRule {
    /// Builds a conditional rule, moving an `"else"` entry out of the branches.
    pub fn conditional(mut branches: IndexMap<String, Vec<String>>) -> Self {
        let otherwise = branches.shift_remove(ELSE_KEY);
        TagRule::Conditional {
            branches,
            otherwise,
        }
    }

    /// Appends the tags this rule contributes for `text`, which must already
    /// be lowercase. The caller has checked that the rule's trigger matched.
    pub fn apply(&self, text: &str, tags: &mut Vec<String>) {
        match self {
            TagRule::Flat(list) => tags.extend(list.iter().cloned()),
            TagRule::Conditional {
                branches,
                otherwise,
            } => {
                let mut found = false;
                for (sub_key, list) in branches {
                    if sub_key == ELSE_KEY {
                        continue;
                    }
                    if text.contains(sub_key.as_str()) {
                        tags.extend(list.iter().cloned());
                        found = true;
                    }
                }
                if !found {
                    if let Some(list) = otherwise {
                        tags.extend(list.iter().cloned());
                    }
                }
            }
        }
    }
}

impl From<RawTagRule> for TagRule {
    fn from(raw: RawTagRule) -> Self {
        match raw {
            RawTagRule::Tags(tags) => TagRule::Flat(tags),
            RawTagRule::Branches(branches) => TagRule::conditional(branches),
        }
    }
}

impl From<TagRule> for RawTagRule {
    fn from(rule: TagRule) -> Self {
        match rule {
            TagRule::Flat(tags) => RawTagRule::Tags(tags),
            TagRule::Conditional {
                mut branches,
                otherwise,
            } => {
                if let Some(list) = otherwise {
                    branches.insert(ELSE_KEY.to_string(), list);
                }
                RawTagRule::Branches(branches)
            }
        }
    }
}

/// Classification rules for one harvesting run.
///
/// The maps stay mutable after loading: callers may add ignore terms or
/// mapping entries between runs through the `*_mut` accessors. The default
/// set is empty: it rejects nothing and maps no triggers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(alias = "ignore_data")]
    ignore_terms: Vec<String>,
    category_mapping: IndexMap<String, String>,
    #[serde(alias = "titleabstract_mapping")]
    title_abstract_mapping: IndexMap<String, TagRule>,
}

/// Top-level keys an override file may replace.
#[derive(Debug, Default, Deserialize)]
struct RuleOverrides {
    #[serde(default, alias = "ignore_data")]
    ignore_terms: Option<Vec<String>>,
    #[serde(default)]
    category_mapping: Option<IndexMap<String, String>>,
    #[serde(default, alias = "titleabstract_mapping")]
    title_abstract_mapping: Option<IndexMap<String, TagRule>>,
}

impl RuleSet {
    /// Loads the base rule file and applies an optional override file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if either file is missing, unreadable
    /// or malformed.
    pub fn load(base: &Path, overrides: Option<&Path>) -> Result<Self, AppError> {
        let mut rules = Self::parse(&read_rule_file(base)?, &base.display().to_string())?;
        if let Some(path) = overrides {
            rules.merge_overrides(&read_rule_file(path)?, &path.display().to_string())?;
        }
        Ok(rules)
    }

    /// Loads the bundled base rules and applies an optional override file.
    pub fn builtin(overrides: Option<&Path>) -> Result<Self, AppError> {
        let mut rules = Self::parse(BASE_RULES, "bundled base rules")?;
        if let Some(path) = overrides {
            rules.merge_overrides(&read_rule_file(path)?, &path.display().to_string())?;
        }
        Ok(rules)
    }

    /// Parses a complete rule set. All three top-level keys are required.
    pub fn from_yaml(src: &str) -> Result<Self, AppError> {
        Self::parse(src, "rules")
    }

    /// Replaces the top-level keys present in `src`, leaving the others alone.
    /// An empty document changes nothing.
    pub fn merge_yaml(&mut self, src: &str) -> Result<(), AppError> {
        self.merge_overrides(src, "rule overrides")
    }

    /// Serializes the rule set back to YAML, keeping map order.
    pub fn to_yaml(&self) -> Result<String, AppError> {
        serde_yaml::to_string(self)
            .map_err(|e| AppError::ConfigError(format!("cannot serialize rules: {}", e)))
    }

    fn parse(src: &str, origin: &str) -> Result<Self, AppError> {
        serde_yaml::from_str(src)
            .map_err(|e| AppError::ConfigError(format!("invalid rules in {}: {}", origin, e)))
    }

    fn merge_overrides(&mut self, src: &str, origin: &str) -> Result<(), AppError> {
        if src.trim().is_empty() {
            return Ok(());
        }
        let overrides: RuleOverrides = serde_yaml::from_str(src)
            .map_err(|e| AppError::ConfigError(format!("invalid rules in {}: {}", origin, e)))?;

        if let Some(terms) = overrides.ignore_terms {
            debug!(origin, count = terms.len(), "Overriding ignore terms");
            self.ignore_terms = terms;
        }
        if let Some(mapping) = overrides.category_mapping {
            debug!(origin, count = mapping.len(), "Overriding category mapping");
            self.category_mapping = mapping;
        }
        if let Some(mapping) = overrides.title_abstract_mapping {
            debug!(origin, count = mapping.len(), "Overriding title/abstract mapping");
            self.title_abstract_mapping = mapping;
        }
        Ok(())
    }

    pub fn ignore_terms(&self) -> &[String] {
        &self.ignore_terms
    }

    pub fn ignore_terms_mut(&mut self) -> &mut Vec<String> {
        &mut self.ignore_terms
    }

    pub fn category_mapping(&self) -> &IndexMap<String, String> {
        &self.category_mapping
    }

    pub fn category_mapping_mut(&mut self) -> &mut IndexMap<String, String> {
        &mut self.category_mapping
    }

    pub fn title_abstract_mapping(&self) -> &IndexMap<String, TagRule> {
        &self.title_abstract_mapping
    }

    pub fn title_abstract_mapping_mut(&mut self) -> &mut IndexMap<String, TagRule> {
        &mut self.title_abstract_mapping
    }

    /// First ignore term contained in `abstract_lower`.
    pub fn matching_ignore_term(&self, abstract_lower: &str) -> Option<&str> {
        self.ignore_terms
            .iter()
            .map(String::as_str)
            .find(|term| abstract_lower.contains(term))
    }

    /// HDX tag for a GeoNode category; unmapped categories pass through.
    pub fn category_tag<'a>(&'a self, category: &'a str) -> &'a str {
        self.category_mapping
            .get(category)
            .map(String::as_str)
            .unwrap_or(category)
    }
}

fn read_rule_file(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(format!("cannot read rules file {}: {}", path.display(), e))
    })
}

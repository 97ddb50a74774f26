//! Harvest service: from a GeoNode server to published HDX datasets.
//!
//! # Architecture
//!
//! The [`Harvester`] is generic over two traits:
//! - [`GeoNodeSource`] - the GeoNode server being harvested
//! - [`CountryLookup`] - resolving region codes to country names
//!
//! The catalog is passed per call as a [`CatalogStore`], so a dry run and a
//! real run share the same harvester.
//!
//! Processing is sequential: one country at a time, one layer at a time, in
//! the order GeoNode lists them. The first transport or catalog error aborts
//! the run.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::classify::classify;
use crate::models::{
    Classification, CountryDescriptor, DatasetDraft, PublishableRecord, RawLayer,
};
use crate::record::{build_record, PublishOptions};
use crate::rules::RuleSet;
use crate::summary::{HarvestStats, LayerOutcome};
use crate::traits::{CatalogStore, CountryLookup, GeoNodeSource};
use crate::AppError;

/// Datasets published by a run, plus counters for reporting.
#[derive(Debug, Clone, Default)]
pub struct HarvestRun {
    /// Every published dataset, in publication order
    pub datasets: Vec<DatasetDraft>,
    pub stats: HarvestStats,
}

/// Harvests one GeoNode server with one rule set.
///
/// # Type Parameters
///
/// * `S` - GeoNode source (e.g., `GeoNodeClient`)
/// * `L` - Country lookup (e.g., `IsoCountryLookup`)
///
/// # Example
///
/// ```ignore
/// use geonode_core::{Harvester, IsoCountryLookup, PublishOptions, RuleSet};
///
/// let rules = RuleSet::builtin(None)?;
/// let harvester = Harvester::new(geonode_client, IsoCountryLookup, rules);
///
/// let options = PublishOptions::new(maintainer_id, org_id, "WFP");
/// let datasets = harvester.run(&options, &catalog, None).await?;
/// if !datasets.is_empty() {
///     harvester.prune(&datasets, &catalog).await?;
/// }
/// ```
pub struct Harvester<S, L>
where
    S: GeoNodeSource,
    L: CountryLookup,
{
    source: S,
    lookup: L,
    rules: RuleSet,
}

impl<S, L> Harvester<S, L>
where
    S: GeoNodeSource,
    L: CountryLookup,
{
    pub fn new(source: S, lookup: L, rules: RuleSet) -> Self {
        Self {
            source,
            lookup,
            rules,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Mutable access to the rule set; changes apply to later layers.
    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    pub fn geonode_url(&self) -> &str {
        self.source.base_url()
    }

    /// Countries the server holds layers for, in server order.
    ///
    /// Regions whose code is not a country are skipped. With `use_count`,
    /// regions whose layer count is missing, null or zero are skipped too.
    pub async fn list_countries(&self, use_count: bool) -> Result<Vec<CountryDescriptor>, AppError> {
        let regions = self.source.fetch_regions().await?;

        let mut countries = Vec::new();
        for region in regions {
            if use_count && region.count.unwrap_or(0) == 0 {
                info!("Region {} has no layers, skipping", region.code);
                continue;
            }
            let Some(name) = self.lookup.country_name(&region.code) else {
                info!("Region {} is not a country, skipping", region.code);
                continue;
            };
            countries.push(CountryDescriptor::new(&region.code, &name));
        }
        Ok(countries)
    }

    /// Layers of one region, or every layer on the server.
    pub async fn list_layers(&self, region: Option<&str>) -> Result<Vec<RawLayer>, AppError> {
        self.source.fetch_layers(region).await
    }

    /// Classifies a layer and builds its dataset and showcase.
    ///
    /// Returns `None`, with a warning, when an ignore term vetoes the layer.
    pub fn generate_record(
        &self,
        country_iso: &str,
        layer: &RawLayer,
        options: &PublishOptions,
    ) -> Option<PublishableRecord> {
        let classification = classify(layer, &self.rules);
        if let Classification::Rejected { term } = &classification {
            warn!(
                "Ignoring layer '{}': abstract contains '{}'",
                layer.title, term
            );
            return None;
        }
        build_record(
            self.source.base_url(),
            country_iso,
            layer,
            &classification,
            options,
        )
    }

    /// Publishes every accepted layer and returns the published datasets.
    ///
    /// # Arguments
    ///
    /// * `options` - Organisation settings for the generated datasets
    /// * `catalog` - Where datasets and showcases are published
    /// * `country` - Harvest only this country; `None` harvests every
    ///   country [`list_countries`](Self::list_countries) returns
    pub async fn run<C: CatalogStore>(
        &self,
        options: &PublishOptions,
        catalog: &C,
        country: Option<&CountryDescriptor>,
    ) -> Result<Vec<DatasetDraft>, AppError> {
        Ok(self.run_with_stats(options, catalog, country).await?.datasets)
    }

    /// Same as [`run`](Self::run), also returning counters.
    pub async fn run_with_stats<C: CatalogStore>(
        &self,
        options: &PublishOptions,
        catalog: &C,
        country: Option<&CountryDescriptor>,
    ) -> Result<HarvestRun, AppError> {
        let countries = match country {
            Some(country) => vec![country.clone()],
            None => self.list_countries(true).await?,
        };
        info!(
            "Harvesting {} country(ies) from {}",
            countries.len(),
            self.source.base_url()
        );

        let mut run = HarvestRun::default();
        run.stats.countries = countries.len();

        for country in &countries {
            let layers = self.list_layers(country.layers.as_deref()).await?;
            info!("{} ({}): {} layer(s)", country.name, country.iso3, layers.len());

            for layer in &layers {
                match self.generate_record(&country.iso3, layer, options) {
                    Some(record) => {
                        catalog.publish(&record.dataset, &record.showcase).await?;
                        info!("Published {}", record.dataset.name);
                        run.stats.record(LayerOutcome::Published);
                        run.datasets.push(record.dataset);
                    }
                    None => run.stats.record(LayerOutcome::Ignored),
                }
            }
        }

        info!(
            "Harvest of {} complete: {} published, {} ignored",
            self.source.base_url(),
            run.stats.published,
            run.stats.ignored
        );
        Ok(run)
    }

    /// Deletes datasets this server published earlier that are no longer on it.
    ///
    /// The organisation and maintainer are taken from the first kept dataset.
    /// A catalog record is removed when its maintainer matches, its name is
    /// not kept, and its first resource URL points at this GeoNode server.
    /// Records without resources are kept.
    ///
    /// Returns the names of the removed records.
    ///
    /// # Errors
    ///
    /// `PreconditionError` if `keep` is empty; catalog errors as returned.
    pub async fn prune<C: CatalogStore>(
        &self,
        keep: &[DatasetDraft],
        catalog: &C,
    ) -> Result<Vec<String>, AppError> {
        let first = keep.first().ok_or_else(|| {
            AppError::PreconditionError("cannot prune without any dataset to keep".to_string())
        })?;
        let keep_names: HashSet<&str> = keep.iter().map(|d| d.name.as_str()).collect();
        let geonode_url = self.source.base_url();

        let mut removed = Vec::new();
        for record in catalog.search_by_organization(&first.owner_org).await? {
            if record.maintainer.as_deref() != Some(first.maintainer.as_str()) {
                continue;
            }
            if keep_names.contains(record.name.as_str()) {
                continue;
            }
            // Only the first resource tells where a dataset came from.
            match record.primary_resource_url() {
                Some(url) if url.contains(geonode_url) => {}
                _ => continue,
            }
            info!("Deleting {}", record.title);
            catalog.remove(&record).await?;
            removed.push(record.name);
        }
        Ok(removed)
    }
}

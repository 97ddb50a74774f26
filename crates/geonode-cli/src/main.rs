use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use dotenvy::dotenv;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use geonode_client::{CkanCatalog, GeoNodeClient};
use geonode_core::{
    default_config_path, load_servers_config, AppError, BatchHarvestSummary, CatalogStore,
    CountryDescriptor, CountryLookup, GeoNodeSource, HarvestStats, Harvester, HttpConfig,
    IsoCountryLookup, PublishOptions, RuleSet, ServerHarvestResult,
};
use geonode_hdx::{Command, Config, HarvestArgs, JsonLinesCatalog};

/// HDX site and credentials from the global arguments.
struct HdxSettings {
    site: String,
    api_key: Option<String>,
}

/// One GeoNode server to harvest and how to publish its layers.
struct HarvestTarget {
    name: String,
    url: String,
    options: PublishOptions,
    country: Option<CountryDescriptor>,
    rules: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Setup logging (stderr to keep stdout clean for JSON and YAML output)
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let Config {
        hdx_site,
        hdx_api_key,
        rules,
        timeout,
        command,
    } = Config::parse();
    let http = HttpConfig::default().with_timeout(Duration::from_secs(timeout));

    match command {
        Command::Countries { geonode_url, all } => {
            list_countries(&http, &geonode_url, all).await?;
        }
        Command::Layers {
            geonode_url,
            country,
        } => {
            list_layers(&http, &geonode_url, country.as_deref()).await?;
        }
        Command::Rules => {
            print_rules(rules.as_deref())?;
        }
        Command::Harvest(args) => {
            let hdx = HdxSettings {
                site: hdx_site,
                api_key: hdx_api_key,
            };
            harvest(&http, &hdx, rules.as_deref(), &args).await?;
        }
    }

    Ok(())
}

/// Wraps a library error with its CLI-friendly message.
fn friendly(e: AppError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

/// Print the server's countries as JSON Lines
async fn list_countries(http: &HttpConfig, geonode_url: &str, all: bool) -> anyhow::Result<()> {
    let source = GeoNodeClient::new(geonode_url, http).map_err(friendly)?;
    // Region listing never classifies, so no rule file is read.
    let harvester = Harvester::new(source, IsoCountryLookup, RuleSet::default());

    let countries = harvester.list_countries(!all).await.map_err(friendly)?;
    for country in &countries {
        println!("{}", serde_json::to_string(country)?);
    }
    info!("{} countries on {}", countries.len(), harvester.geonode_url());
    Ok(())
}

/// Print the server's layers as JSON Lines
async fn list_layers(
    http: &HttpConfig,
    geonode_url: &str,
    country: Option<&str>,
) -> anyhow::Result<()> {
    let source = GeoNodeClient::new(geonode_url, http).map_err(friendly)?;
    let region = country.map(str::to_uppercase);

    let layers = source
        .fetch_layers(region.as_deref())
        .await
        .map_err(friendly)?;
    for layer in &layers {
        println!("{}", serde_json::to_string(layer)?);
    }
    info!("{} layers on {}", layers.len(), source.base_url());
    Ok(())
}

/// Print the merged rule set as YAML
fn print_rules(rules: Option<&Path>) -> anyhow::Result<()> {
    let rules = RuleSet::builtin(rules).map_err(friendly)?;
    print!("{}", rules.to_yaml().map_err(friendly)?);
    Ok(())
}

/// Harvest one or more GeoNode servers into HDX
async fn harvest(
    http: &HttpConfig,
    hdx: &HdxSettings,
    rules: Option<&Path>,
    args: &HarvestArgs,
) -> anyhow::Result<()> {
    let targets = resolve_targets(args, rules)?;
    let prune = !args.no_prune && !args.dry_run;

    if args.dry_run {
        info!("Dry run: nothing will be published to {}", hdx.site);
        let catalog = JsonLinesCatalog::stdout();
        harvest_targets(&targets, &catalog, http, prune).await
    } else {
        let api_key = hdx
            .api_key
            .as_deref()
            .context("HDX_API_KEY is required unless --dry-run is given")?;
        let catalog = CkanCatalog::new(&hdx.site, Some(api_key), http).map_err(friendly)?;
        harvest_targets(&targets, &catalog, http, prune).await
    }
}

/// Builds the harvest targets from a URL and flags, or from servers.toml.
fn resolve_targets(
    args: &HarvestArgs,
    rules: Option<&Path>,
) -> anyhow::Result<Vec<HarvestTarget>> {
    let cli_country = args
        .country
        .as_deref()
        .map(|iso3| country_descriptor(iso3, !args.unfiltered))
        .transpose()?;

    if let Some(url) = &args.geonode_url {
        let (Some(maintainer_id), Some(org_id), Some(org_name)) =
            (args.maintainer_id, args.org_id, args.org_name.as_deref())
        else {
            bail!("--maintainer-id, --org-id and --org-name are required when harvesting a URL");
        };
        let options =
            PublishOptions::new(&maintainer_id.to_string(), &org_id.to_string(), org_name)
                .with_update_frequency(args.update_frequency.unwrap_or_default())
                .with_subnational(!args.national);

        return Ok(vec![HarvestTarget {
            name: org_name.to_string(),
            url: url.clone(),
            options,
            country: cli_country,
            rules: rules.map(Path::to_path_buf),
        }]);
    }

    let config_path = args.config.clone().or_else(default_config_path);
    let config = load_servers_config(args.config.as_deref())
        .map_err(friendly)?
        .with_context(|| {
            format!(
                "No servers configured. Pass a GeoNode URL or create {}",
                config_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "servers.toml".to_string())
            )
        })?;
    let config_dir = config_path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let entries = match &args.server {
        Some(name) => vec![config
            .find_by_name(name)
            .with_context(|| format!("Server '{}' not found in config", name))?],
        None => config.enabled_servers(),
    };
    if entries.is_empty() {
        bail!("No enabled servers in config");
    }

    let mut targets = Vec::with_capacity(entries.len());
    for entry in entries {
        let country = match (&cli_country, &entry.country) {
            (Some(country), _) => Some(country.clone()),
            (None, Some(iso3)) => entry.country_descriptor(&country_name(iso3)?),
            (None, None) => None,
        };
        targets.push(HarvestTarget {
            name: entry.name.clone(),
            url: entry.url.clone(),
            options: entry.publish_options(),
            country,
            rules: rules
                .map(Path::to_path_buf)
                .or_else(|| entry.rules_path(&config_dir)),
        });
    }
    Ok(targets)
}

fn country_name(iso3: &str) -> anyhow::Result<String> {
    IsoCountryLookup
        .country_name(iso3)
        .with_context(|| format!("'{}' is not an ISO3 country code", iso3))
}

fn country_descriptor(iso3: &str, filtered: bool) -> anyhow::Result<CountryDescriptor> {
    let iso3 = iso3.to_uppercase();
    let name = country_name(&iso3)?;
    Ok(if filtered {
        CountryDescriptor::new(&iso3, &name)
    } else {
        CountryDescriptor::unfiltered(&iso3, &name)
    })
}

async fn harvest_targets<C: CatalogStore>(
    targets: &[HarvestTarget],
    catalog: &C,
    http: &HttpConfig,
    prune: bool,
) -> anyhow::Result<()> {
    if let [target] = targets {
        let stats = harvest_one(target, catalog, http, prune)
            .await
            .map_err(friendly)?;
        print_stats(target, &stats);
        return Ok(());
    }

    let mut summary = BatchHarvestSummary::new();
    for target in targets {
        match harvest_one(target, catalog, http, prune).await {
            Ok(stats) => {
                print_stats(target, &stats);
                summary.add(ServerHarvestResult::success(
                    target.name.clone(),
                    target.url.clone(),
                    stats,
                ));
            }
            Err(e) => {
                error!("Harvest of {} failed: {}", target.name, e.user_message());
                summary.add(ServerHarvestResult::failure(
                    target.name.clone(),
                    target.url.clone(),
                    e.to_string(),
                ));
            }
        }
    }

    print_summary(&summary);
    if summary.failed_count() > 0 {
        bail!(
            "{} of {} servers failed",
            summary.failed_count(),
            summary.total_servers()
        );
    }
    Ok(())
}

async fn harvest_one<C: CatalogStore>(
    target: &HarvestTarget,
    catalog: &C,
    http: &HttpConfig,
    prune: bool,
) -> Result<HarvestStats, AppError> {
    info!("Harvesting {} ({})", target.name, target.url);

    let rules = RuleSet::builtin(target.rules.as_deref())?;
    let source = GeoNodeClient::new(&target.url, http)?;
    let harvester = Harvester::new(source, IsoCountryLookup, rules);

    let run = harvester
        .run_with_stats(&target.options, catalog, target.country.as_ref())
        .await?;
    let mut stats = run.stats;

    if !prune {
        info!("Pruning disabled");
    } else if target.country.is_some() {
        info!("Single-country harvest, not pruning");
    } else if run.datasets.is_empty() {
        info!("Nothing published, not pruning");
    } else {
        stats.pruned = harvester.prune(&run.datasets, catalog).await?.len();
    }
    Ok(stats)
}

fn print_stats(target: &HarvestTarget, stats: &HarvestStats) {
    info!("═══════════════════════════════════════════════════════");
    info!("Harvest complete: {} ({})", target.name, target.url);
    info!("═══════════════════════════════════════════════════════");
    info!("  Countries:           {}", stats.countries);
    info!("  Layers:              {}", stats.total_layers());
    info!("───────────────────────────────────────────────────────");
    info!("  + Published:         {}", stats.published);
    info!("  - Ignored:           {}", stats.ignored);
    info!("  ✗ Pruned:            {}", stats.pruned);
    info!("═══════════════════════════════════════════════════════");
}

fn print_summary(summary: &BatchHarvestSummary) {
    info!("═══════════════════════════════════════════════════════");
    info!("Batch harvest: {} servers", summary.total_servers());
    info!("═══════════════════════════════════════════════════════");
    info!("  Successful:          {}", summary.successful_count());
    info!("  Failed:              {}", summary.failed_count());
    info!("  Datasets published:  {}", summary.total_published());
    for result in summary.results.iter().filter(|r| !r.is_success()) {
        error!(
            "  ✗ {} ({}): {}",
            result.server_name,
            result.server_url,
            result.error.as_deref().unwrap_or_default()
        );
    }
    info!("═══════════════════════════════════════════════════════");
}

use clap::{Args, Parser, Subcommand};
use geonode_core::UpdateFrequency;
use std::path::PathBuf;
use uuid::Uuid;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "geonode-hdx")]
#[command(
    author,
    version,
    about = "Publishes GeoNode layers as HDX datasets and showcases"
)]
#[command(after_help = "Examples:
  geonode-hdx countries --geonode-url https://geonode.wfp.org
  geonode-hdx layers --geonode-url https://geonode.wfp.org --country SDN
  geonode-hdx rules --rules wfp_rules.yml
  geonode-hdx harvest --server wfp --dry-run")]
pub struct Config {
    /// Base URL of the HDX (CKAN) site datasets are published to
    #[arg(long, env = "HDX_SITE", default_value = "https://data.humdata.org")]
    pub hdx_site: String,

    /// HDX API key, required unless running with --dry-run
    #[arg(long, env = "HDX_API_KEY", hide_env_values = true)]
    pub hdx_api_key: Option<String>,

    /// YAML rule file overriding sections of the built-in rules
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", default_value = "30")]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the countries a GeoNode server holds layers for
    Countries {
        /// Base URL of the GeoNode server
        #[arg(long, value_name = "URL")]
        geonode_url: String,
        /// Include regions GeoNode reports no layers for
        #[arg(long)]
        all: bool,
    },
    /// Print a GeoNode server's layers as JSON Lines
    Layers {
        /// Base URL of the GeoNode server
        #[arg(long, value_name = "URL")]
        geonode_url: String,
        /// Only layers tagged with this ISO3 region code
        #[arg(long, value_name = "ISO3")]
        country: Option<String>,
    },
    /// Print the effective rule set as YAML
    Rules,
    /// Publish GeoNode layers to HDX
    #[command(after_help = "Examples:
  geonode-hdx harvest                         # Harvest all enabled servers from config
  geonode-hdx harvest --server mimu           # Harvest server by name from config
  geonode-hdx harvest https://geonode.wfp.org --org-name WFP \\
      --org-id 3ecac442-7fed-448d-8f78-b385ef6f84e7 \\
      --maintainer-id d7a13725-5cb5-48f4-87ac-a70b5cea531e
  geonode-hdx harvest --server wfp --dry-run > datasets.jsonl")]
    Harvest(HarvestArgs),
}

/// Arguments of `harvest`.
#[derive(Args, Debug, Clone)]
pub struct HarvestArgs {
    /// URL of a single GeoNode server; requires the organisation arguments
    #[arg(value_name = "URL")]
    pub geonode_url: Option<String>,

    /// Harvest a specific server by name from the config file
    #[arg(short, long, value_name = "NAME", conflicts_with = "geonode_url")]
    pub server: Option<String>,

    /// Custom path to servers.toml
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// HDX user id of the datasets' maintainer
    #[arg(long, value_name = "UUID", requires = "geonode_url")]
    pub maintainer_id: Option<Uuid>,

    /// HDX id of the owning organisation
    #[arg(long, value_name = "UUID", requires = "geonode_url")]
    pub org_id: Option<Uuid>,

    /// Organisation name, used as the dataset slug prefix
    #[arg(long, value_name = "NAME", requires = "geonode_url")]
    pub org_name: Option<String>,

    /// Expected update frequency, e.g. "Adhoc", "every month", "30"
    #[arg(long, value_name = "FREQUENCY", requires = "geonode_url")]
    pub update_frequency: Option<UpdateFrequency>,

    /// Mark datasets as national rather than subnational
    #[arg(long, requires = "geonode_url")]
    pub national: bool,

    /// Harvest a single country (ISO3) instead of every country
    #[arg(long, value_name = "ISO3")]
    pub country: Option<String>,

    /// With --country, take every layer on the server instead of filtering by region
    #[arg(long, requires = "country")]
    pub unfiltered: bool,

    /// Print datasets and showcases as JSON Lines instead of publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Do not delete datasets that disappeared from the server
    #[arg(long)]
    pub no_prune: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_harvest_single_url() {
        let config = Config::try_parse_from([
            "geonode-hdx",
            "harvest",
            "https://geonode.wfp.org",
            "--org-name",
            "WFP",
            "--org-id",
            "3ecac442-7fed-448d-8f78-b385ef6f84e7",
            "--maintainer-id",
            "d7a13725-5cb5-48f4-87ac-a70b5cea531e",
            "--update-frequency",
            "every month",
            "--national",
        ])
        .unwrap();

        let Command::Harvest(args) = config.command else {
            panic!("expected harvest");
        };
        assert_eq!(args.geonode_url.as_deref(), Some("https://geonode.wfp.org"));
        assert_eq!(args.org_name.as_deref(), Some("WFP"));
        assert_eq!(args.update_frequency, Some(UpdateFrequency::Monthly));
        assert!(args.national);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_parse_harvest_rejects_bad_uuid() {
        let result = Config::try_parse_from([
            "geonode-hdx",
            "harvest",
            "https://geonode.wfp.org",
            "--org-id",
            "wfp",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_conflicts_with_url() {
        let result = Config::try_parse_from([
            "geonode-hdx",
            "harvest",
            "https://geonode.wfp.org",
            "--server",
            "wfp",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unfiltered_requires_country() {
        let result =
            Config::try_parse_from(["geonode-hdx", "harvest", "--server", "mimu", "--unfiltered"]);
        assert!(result.is_err());

        let config = Config::try_parse_from([
            "geonode-hdx",
            "harvest",
            "--server",
            "mimu",
            "--country",
            "MMR",
            "--unfiltered",
            "--dry-run",
        ])
        .unwrap();
        let Command::Harvest(args) = config.command else {
            panic!("expected harvest");
        };
        assert!(args.unfiltered);
        assert!(args.dry_run);
    }

    #[test]
    fn test_parse_countries_and_timeout() {
        let config = Config::try_parse_from([
            "geonode-hdx",
            "--timeout",
            "5",
            "countries",
            "--geonode-url",
            "https://geonode.wfp.org",
            "--all",
        ])
        .unwrap();
        assert_eq!(config.timeout, 5);
        assert!(matches!(
            config.command,
            Command::Countries { all: true, .. }
        ));
    }
}

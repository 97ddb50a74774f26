//! Configuration types for the harvester.
//!
//! Servers to harvest are listed in a TOML file, by default
//! `~/.config/geonode-hdx/servers.toml` on Linux:
//!
//! ```toml
//! [[servers]]
//! name = "wfp"
//! url = "https://geonode.wfp.org"
//! org_name = "WFP"
//! org_id = "3ecac442-7fed-448d-8f78-b385ef6f84e7"
//! maintainer_id = "d7a13725-5cb5-48f4-87ac-a70b5cea531e"
//! update_frequency = "Adhoc"
//!
//! [[servers]]
//! name = "mimu"
//! url = "http://geonode.themimu.info"
//! org_name = "MIMU"
//! org_id = "bde18602-2e92-462a-8e88-a0018a7b13f9"
//! maintainer_id = "196196be-6037-4488-8b71-d786adf4c081"
//! country = "MMR"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::{CountryDescriptor, UpdateFrequency};
use crate::record::PublishOptions;
use crate::AppError;

const CONFIG_DIR_NAME: &str = "geonode-hdx";
const CONFIG_FILENAME: &str = "servers.toml";

/// HTTP client configuration for the GeoNode and HDX APIs.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("geonode-hdx/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn default_true() -> bool {
    true
}

/// One GeoNode server and the HDX organisation its layers are published under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub name: String,
    pub url: String,
    pub org_name: String,
    pub org_id: Uuid,
    pub maintainer_id: Uuid,
    #[serde(default)]
    pub update_frequency: UpdateFrequency,
    #[serde(default = "default_true")]
    pub subnational: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Override rule file, relative paths resolve against the config file's directory
    #[serde(default)]
    pub rules: Option<PathBuf>,
    /// ISO3 code of a server that only holds data for one country
    #[serde(default)]
    pub country: Option<String>,
    /// With `country`, filter layers by the country's region code
    #[serde(default)]
    pub region_filter: bool,
}

impl ServerEntry {
    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions::new(
            &self.maintainer_id.to_string(),
            &self.org_id.to_string(),
            &self.org_name,
        )
        .with_update_frequency(self.update_frequency)
        .with_subnational(self.subnational)
    }

    /// Descriptor for single-country servers; `None` harvests every country.
    pub fn country_descriptor(&self, name: &str) -> Option<CountryDescriptor> {
        let iso3 = self.country.as_deref()?.to_uppercase();
        Some(if self.region_filter {
            CountryDescriptor::new(&iso3, name)
        } else {
            CountryDescriptor::unfiltered(&iso3, name)
        })
    }

    /// Rule override path resolved against `base_dir`.
    pub fn rules_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.rules.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                base_dir.join(p)
            }
        })
    }
}

/// Contents of `servers.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServersConfig {
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

impl ServersConfig {
    pub fn enabled_servers(&self) -> Vec<&ServerEntry> {
        self.servers.iter().filter(|s| s.enabled).collect()
    }

    /// Looks a server up by name, case-insensitively.
    pub fn find_by_name(&self, name: &str) -> Option<&ServerEntry> {
        self.servers
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// Default location of `servers.toml`, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILENAME))
}

/// Loads the servers configuration.
///
/// With no explicit path, a missing default file yields `Ok(None)`.
/// An explicit path that does not exist, an unreadable file or malformed
/// TOML is a `ConfigError`.
pub fn load_servers_config(path: Option<&Path>) -> Result<Option<ServersConfig>, AppError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(None),
        },
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
            info!("No servers file found at {}", path.display());
            return Ok(None);
        }
        Err(e) => {
            return Err(AppError::ConfigError(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let config: ServersConfig = toml::from_str(&content)
        .map_err(|e| AppError::ConfigError(format!("invalid {}: {}", path.display(), e)))?;
    info!(
        "Loaded {} server(s) from {}",
        config.servers.len(),
        path.display()
    );
    Ok(Some(config))
}

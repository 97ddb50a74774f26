//! GeoNode to HDX core - rules, classification, record generation and
//! harvest orchestration.

pub mod classify;
pub mod config;
pub mod country;
pub mod error;
pub mod harvest;
pub mod models;
pub mod record;
pub mod rules;
pub mod summary;
pub mod traits;

pub use classify::{classify, GEODATA_TAG};
pub use config::{default_config_path, load_servers_config, HttpConfig, ServerEntry, ServersConfig};
pub use country::IsoCountryLookup;
pub use error::AppError;
pub use harvest::{HarvestRun, Harvester};
pub use models::{
    ApiList, Classification, CountryDescriptor, DatasetDraft, PublishableRecord, PublishedRecord,
    RawLayer, RegionRecord, ResourceDraft, ShowcaseDraft, UpdateFrequency,
};
pub use record::{build_record, PublishOptions};
pub use rules::{RuleSet, TagRule};
pub use summary::{BatchHarvestSummary, HarvestStats, LayerOutcome, ServerHarvestResult};
pub use traits::{CatalogStore, CountryLookup, GeoNodeSource};

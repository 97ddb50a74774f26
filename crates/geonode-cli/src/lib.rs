//! GeoNode HDX CLI - Command-line interface for the GeoNode to HDX harvester
//!
//! This crate provides the CLI application that ties together all components.

pub mod config;
pub mod dry_run;

pub use config::{Command, Config, HarvestArgs};
pub use dry_run::JsonLinesCatalog;

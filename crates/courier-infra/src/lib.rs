//! Infrastructure layer for Courier.
//!
//! Everything that touches the filesystem lives here, so the dispatch core
//! stays free of IO: currently the `config.toml` loader.

pub mod config;

pub use config::{load_bus_config, resolve_config_dir};

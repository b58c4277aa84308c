//! Configuration for connections and records.
//!
//! `ConnectionConfig` describes how to reach the service (TOML-loadable),
//! `RecordOptions` describes one record: its metadata and its buffering
//! behavior. Both follow the same contract: construct, optionally mutate,
//! then `validate()` before use. Validation fills defaults in place.

pub mod connection;
pub mod record;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

pub use connection::ConnectionConfig;
pub use record::RecordOptions;

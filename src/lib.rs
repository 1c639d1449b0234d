//! webapp-kit
//!
//! Support utilities for a web application backend and its tooling.
//!
//! # Features
//!
//! - **Text**: PII censoring, slugs, case conversion, input predicates
//! - **Request Pipeline**: one choke point for backend calls with bearer
//!   credential attachment, trace ids and structured logging
//! - **Storage**: durable and session key-value namespaces
//! - **Config**: immutable, environment-driven application configuration
//! - **i18n**: message lookup with language fallback

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod i18n;
pub mod json;
pub mod pipeline;
pub mod storage;
pub mod text;
pub mod transport;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

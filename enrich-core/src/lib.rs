//! Core library for the `enrich` CLI.
//!
//! This crate defines:
//! - A timeout-bounded HTTP call wrapper with a typed failure taxonomy
//! - Geocode, weather and currency-conversion clients behind capability traits
//! - The per-row enricher and the order-preserving batch runner
//! - Input/output formats and configuration
//!
//! It is used by `enrich-cli`, but can also be reused by other binaries or services.

pub mod batch;
pub mod config;
pub mod enrich;
pub mod error;
pub mod http;
pub mod io;
pub mod model;
pub mod provider;

pub use batch::{BatchError, BatchReport, BatchStats, enrich_all};
pub use config::{Config, Endpoints};
pub use enrich::Enricher;
pub use error::{CallError, CallErrorKind};
pub use io::OutputFormat;
pub use model::{EnrichedRow, FxResult, GeoResult, InputRow, WeatherResult};
pub use provider::{FxConverter, Geocoder, ServiceKind, WeatherSource, enricher_from_config};

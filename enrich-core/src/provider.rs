use crate::{
    Config, Enricher, FxResult, GeoResult, WeatherResult,
    error::CallError,
    http::HttpCaller,
    provider::{exchangerate::ExchangeRateHost, open_meteo::OpenMeteo},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod exchangerate;
pub mod open_meteo;

/// The three remote capabilities a row is enriched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Geocode,
    Weather,
    Fx,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Geocode => "geocode",
            ServiceKind::Weather => "weather",
            ServiceKind::Fx => "fx",
        }
    }

    pub const fn all() -> &'static [ServiceKind] {
        &[ServiceKind::Geocode, ServiceKind::Weather, ServiceKind::Fx]
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Coordinates of the best match for `city` within `country_code`.
    async fn geocode(&self, city: &str, country_code: &str) -> Result<GeoResult, CallError>;
}

#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Current conditions at a geocoded location.
    async fn current_weather(&self, location: &GeoResult) -> Result<WeatherResult, CallError>;
}

#[async_trait]
pub trait FxConverter: Send + Sync + Debug {
    /// Convert `amount` of `from_currency` into USD.
    async fn convert(&self, from_currency: &str, amount: f64) -> Result<FxResult, CallError>;
}

/// Build the production enricher from config: Open-Meteo for geo and weather, exchangerate.host for FX.
pub fn enricher_from_config(config: &Config) -> anyhow::Result<Enricher> {
    let http = HttpCaller::new(config.timeout())?;

    let open_meteo = Arc::new(OpenMeteo::new(
        http.clone(),
        &config.endpoints.geocode,
        &config.endpoints.forecast,
    )?);
    let fx = Arc::new(ExchangeRateHost::new(http, &config.endpoints.fx)?);

    Ok(Enricher::new(open_meteo.clone(), open_meteo, fx))
}

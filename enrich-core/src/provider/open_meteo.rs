use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    error::CallError,
    http::HttpCaller,
    model::{GeoResult, WeatherResult},
    provider::ServiceKind,
};

use super::{Geocoder, WeatherSource};

/// Open-Meteo geocoding and forecast APIs. Neither needs an API key.
#[derive(Debug, Clone)]
pub struct OpenMeteo {
    http: HttpCaller,
    geocode_url: Url,
    forecast_url: Url,
}

impl OpenMeteo {
    pub fn new(http: HttpCaller, geocode_url: &str, forecast_url: &str) -> Result<Self> {
        let geocode_url = Url::parse(geocode_url)
            .with_context(|| format!("Invalid geocode endpoint URL '{geocode_url}'"))?;
        let forecast_url = Url::parse(forecast_url)
            .with_context(|| format!("Invalid forecast endpoint URL '{forecast_url}'"))?;

        Ok(Self { http, geocode_url, forecast_url })
    }
}

#[derive(Debug, Deserialize)]
struct OmSearchResponse {
    #[serde(default)]
    results: Option<Vec<OmPlace>>,
}

#[derive(Debug, Deserialize)]
struct OmPlace {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    current_weather: Option<OmCurrentWeather>,
}

#[derive(Debug, Deserialize)]
struct OmCurrentWeather {
    temperature: Option<f64>,
    windspeed: Option<f64>,
}

#[async_trait]
impl Geocoder for OpenMeteo {
    async fn geocode(&self, city: &str, country_code: &str) -> Result<GeoResult, CallError> {
        if city.trim().is_empty() {
            return Err(CallError::no_match(ServiceKind::Geocode, "empty city name"));
        }

        let parsed: OmSearchResponse = self
            .http
            .get_json(
                ServiceKind::Geocode,
                &self.geocode_url,
                &[
                    ("name", city.to_string()),
                    ("countryCode", country_code.to_string()),
                    ("count", "1".to_string()),
                ],
            )
            .await?;

        let place = parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| {
                CallError::no_match(ServiceKind::Geocode, format!("no results for '{city}, {country_code}'"))
            })?;

        match (place.latitude, place.longitude) {
            (Some(latitude), Some(longitude)) => Ok(GeoResult { latitude, longitude }),
            _ => Err(CallError::parse(ServiceKind::Geocode, "first match has no coordinates")),
        }
    }
}

#[async_trait]
impl WeatherSource for OpenMeteo {
    async fn current_weather(&self, location: &GeoResult) -> Result<WeatherResult, CallError> {
        let parsed: OmForecastResponse = self
            .http
            .get_json(
                ServiceKind::Weather,
                &self.forecast_url,
                &[
                    ("latitude", location.latitude.to_string()),
                    ("longitude", location.longitude.to_string()),
                    ("current_weather", "true".to_string()),
                    ("windspeed_unit", "ms".to_string()),
                ],
            )
            .await?;

        let current = parsed
            .current_weather
            .ok_or_else(|| CallError::parse(ServiceKind::Weather, "response has no current_weather"))?;

        match (current.temperature, current.windspeed) {
            (Some(temperature_c), Some(wind_speed_mps)) => Ok(WeatherResult { temperature_c, wind_speed_mps }),
            _ => Err(CallError::parse(
                ServiceKind::Weather,
                "current_weather lacks temperature or windspeed",
            )),
        }
    }
}

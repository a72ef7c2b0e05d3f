use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    error::CallError,
    model::{EnrichedRow, GeoResult, InputRow, WeatherResult},
    provider::{FxConverter, Geocoder, WeatherSource},
};

/// Enriches one row at a time from the three capability providers.
///
/// Cheap to clone; every clone shares the same providers.
#[derive(Debug, Clone)]
pub struct Enricher {
    geocoder: Arc<dyn Geocoder>,
    weather: Arc<dyn WeatherSource>,
    fx: Arc<dyn FxConverter>,
}

impl Enricher {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        weather: Arc<dyn WeatherSource>,
        fx: Arc<dyn FxConverter>,
    ) -> Self {
        Self { geocoder, weather, fx }
    }

    /// Enrich a single row. Sub-call failures null their field group; this never fails.
    pub async fn enrich(&self, row: &InputRow) -> EnrichedRow {
        let (located, fx) = tokio::join!(self.locate(row), self.fx.convert(&row.local_currency, row.amount));

        let (geo, weather) = located;
        let fx = match fx {
            Ok(fx) => {
                debug!(
                    city = %row.city,
                    rate = fx.rate_to_usd,
                    amount_usd = fx.amount_usd,
                    "converted {} {} to USD",
                    row.amount,
                    row.local_currency
                );
                Some(fx)
            }
            Err(err) => {
                log_failure(row, &err);
                None
            }
        };

        EnrichedRow::from_parts(row, geo, weather, fx, Utc::now())
    }

    /// Geocode, then fetch weather for the resulting coordinates.
    async fn locate(&self, row: &InputRow) -> (Option<GeoResult>, Option<WeatherResult>) {
        let geo = match self.geocoder.geocode(&row.city, &row.country_code).await {
            Ok(geo) => {
                debug!(city = %row.city, lat = geo.latitude, lon = geo.longitude, "geocoded");
                geo
            }
            Err(err) => {
                log_failure(row, &err);
                return (None, None);
            }
        };

        match self.weather.current_weather(&geo).await {
            Ok(weather) => {
                debug!(
                    city = %row.city,
                    temperature_c = weather.temperature_c,
                    wind_speed_mps = weather.wind_speed_mps,
                    "current weather"
                );
                (Some(geo), Some(weather))
            }
            Err(err) => {
                log_failure(row, &err);
                (Some(geo), None)
            }
        }
    }
}

fn log_failure(row: &InputRow, err: &CallError) {
    if err.kind.is_fault() {
        warn!(city = %row.city, service = %err.service, kind = %err.kind, "{}", err.detail);
    } else {
        debug!(city = %row.city, service = %err.service, "{}", err.detail);
    }
}

/// In-process providers for exercising the enricher and the batch runner.
#[cfg(test)]
pub(crate) mod fakes {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::CallErrorKind,
        model::FxResult,
        provider::ServiceKind,
    };

    #[derive(Debug, Default)]
    pub struct FakeGeocoder {
        pub places: HashMap<String, GeoResult>,
        pub delays: HashMap<String, Duration>,
        pub calls: AtomicUsize,
    }

    impl FakeGeocoder {
        pub fn with(mut self, city: &str, latitude: f64, longitude: f64) -> Self {
            self.places.insert(city.to_string(), GeoResult { latitude, longitude });
            self
        }

        pub fn delay(mut self, city: &str, delay: Duration) -> Self {
            self.delays.insert(city.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, city: &str, _country_code: &str) -> Result<GeoResult, CallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(city) {
                tokio::time::sleep(*delay).await;
            }
            self.places
                .get(city)
                .copied()
                .ok_or_else(|| CallError::no_match(ServiceKind::Geocode, format!("no results for '{city}'")))
        }
    }

    #[derive(Debug)]
    pub struct FakeWeather {
        pub result: Result<WeatherResult, CallErrorKind>,
        pub calls: AtomicUsize,
    }

    impl FakeWeather {
        pub fn ok(temperature_c: f64, wind_speed_mps: f64) -> Self {
            Self { result: Ok(WeatherResult { temperature_c, wind_speed_mps }), calls: AtomicUsize::new(0) }
        }

        pub fn failing(kind: CallErrorKind) -> Self {
            Self { result: Err(kind), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl WeatherSource for FakeWeather {
        async fn current_weather(&self, _location: &GeoResult) -> Result<WeatherResult, CallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .map_err(|kind| CallError::new(ServiceKind::Weather, kind, "injected failure"))
        }
    }

    #[derive(Debug)]
    pub struct FakeFx {
        pub rate: Option<f64>,
        pub calls: AtomicUsize,
    }

    impl FakeFx {
        pub fn rate(rate: f64) -> Self {
            Self { rate: Some(rate), calls: AtomicUsize::new(0) }
        }

        pub fn failing() -> Self {
            Self { rate: None, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl FxConverter for FakeFx {
        async fn convert(&self, _from_currency: &str, amount: f64) -> Result<FxResult, CallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rate
                .map(|rate| FxResult { rate_to_usd: rate, amount_usd: amount * rate })
                .ok_or_else(|| CallError::new(ServiceKind::Fx, CallErrorKind::Timeout, "injected timeout"))
        }
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

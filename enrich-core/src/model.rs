use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One expense record read from the input file.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRow {
    pub city: String,
    pub country_code: String,
    pub local_currency: String,
    pub amount: f64,
}

impl InputRow {
    /// Build a row from raw text fields, trimming them and upper-casing the codes.
    pub fn parse(city: &str, country_code: &str, local_currency: &str, amount: &str) -> Result<Self> {
        let amount = parse_amount(amount)
            .ok_or_else(|| anyhow!("Invalid amount '{}': expected a non-negative number", amount.trim()))?;

        Ok(Self {
            city: city.trim().to_string(),
            country_code: country_code.trim().to_ascii_uppercase(),
            local_currency: local_currency.trim().to_ascii_uppercase(),
            amount,
        })
    }
}

/// Parse a finite, non-negative decimal amount.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|amt| amt.is_finite() && *amt >= 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoResult {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub temperature_c: f64,
    pub wind_speed_mps: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FxResult {
    pub rate_to_usd: f64,
    pub amount_usd: f64,
}

impl FxResult {
    /// Conversion of an amount that is already in USD.
    pub fn identity(amount: f64) -> Self {
        Self { rate_to_usd: 1.0, amount_usd: amount }
    }
}

/// The output record. Field order here is the output column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub city: String,
    pub country_code: String,
    pub local_currency: String,
    pub amount_local: f64,
    pub fx_rate_to_usd: Option<f64>,
    pub amount_usd: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub temperature_c: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    #[serde(with = "utc_seconds")]
    pub retrieved_at: DateTime<Utc>,
}

impl EnrichedRow {
    /// Assemble a row from whole field groups. Weather without a location is dropped.
    pub fn from_parts(
        row: &InputRow,
        geo: Option<GeoResult>,
        weather: Option<WeatherResult>,
        fx: Option<FxResult>,
        retrieved_at: DateTime<Utc>,
    ) -> Self {
        let weather = weather.filter(|_| geo.is_some());

        Self {
            city: row.city.clone(),
            country_code: row.country_code.clone(),
            local_currency: row.local_currency.clone(),
            amount_local: row.amount,
            fx_rate_to_usd: fx.map(|f| f.rate_to_usd),
            amount_usd: fx.map(|f| f.amount_usd),
            latitude: geo.map(|g| g.latitude),
            longitude: geo.map(|g| g.longitude),
            temperature_c: weather.map(|w| w.temperature_c),
            wind_speed_mps: weather.map(|w| w.wind_speed_mps),
            retrieved_at,
        }
    }

    pub fn has_geo(&self) -> bool {
        self.latitude.is_some()
    }

    pub fn has_weather(&self) -> bool {
        self.temperature_c.is_some()
    }

    pub fn has_fx(&self) -> bool {
        self.amount_usd.is_some()
    }

    /// True when at least one field group is null.
    pub fn is_partial(&self) -> bool {
        !(self.has_geo() && self.has_weather() && self.has_fx())
    }
}

/// ISO-8601 in UTC with second precision, e.g. `2026-10-19T08:15:00Z`.
mod utc_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn berlin() -> InputRow {
        InputRow::parse("Berlin", "DE", "EUR", "89.90").expect("valid row")
    }

    #[test]
    fn parse_amount_accepts_non_negative_numbers_only() {
        assert_eq!(parse_amount("12.5"), Some(12.5));
        assert_eq!(parse_amount(" 0 "), Some(0.0));
        assert_eq!(parse_amount("-1"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn input_row_normalizes_codes() {
        let row = InputRow::parse("  Lisbon ", "pt", " eur", "10").unwrap();
        assert_eq!(row.city, "Lisbon");
        assert_eq!(row.country_code, "PT");
        assert_eq!(row.local_currency, "EUR");
        assert_eq!(row.amount, 10.0);
    }

    #[test]
    fn input_row_rejects_negative_amount() {
        let err = InputRow::parse("Paris", "FR", "EUR", "-3").unwrap_err();
        assert!(err.to_string().contains("Invalid amount '-3'"));
    }

    #[test]
    fn weather_is_dropped_without_geo() {
        let weather = WeatherResult { temperature_c: 20.0, wind_speed_mps: 1.0 };
        let out = EnrichedRow::from_parts(&berlin(), None, Some(weather), None, Utc::now());

        assert_eq!(out.latitude, None);
        assert_eq!(out.longitude, None);
        assert_eq!(out.temperature_c, None);
        assert_eq!(out.wind_speed_mps, None);
        assert!(out.is_partial());
    }

    #[test]
    fn complete_row_is_not_partial() {
        let out = EnrichedRow::from_parts(
            &berlin(),
            Some(GeoResult { latitude: 52.52437, longitude: 13.41053 }),
            Some(WeatherResult { temperature_c: 12.3, wind_speed_mps: 3.8 }),
            Some(FxResult { rate_to_usd: 1.07, amount_usd: 96.19 }),
            Utc::now(),
        );

        assert!(!out.is_partial());
        assert_eq!(out.amount_local, 89.90);
        assert_eq!(out.fx_rate_to_usd, Some(1.07));
    }

    #[test]
    fn serializes_nulls_and_second_precision_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 15, 0).unwrap();
        let out = EnrichedRow::from_parts(&berlin(), None, None, Some(FxResult::identity(5.0)), at);

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["retrieved_at"], "2026-10-19T08:15:00Z");
        assert!(json["latitude"].is_null());
        assert!(json["wind_speed_mps"].is_null());
        assert_eq!(json["fx_rate_to_usd"], 1.0);

        let back: EnrichedRow = serde_json::from_value(json).unwrap();
        assert_eq!(back, out);
    }
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::{error::CallError, http::HttpCaller, model::FxResult, provider::ServiceKind};

use super::FxConverter;

const TARGET_CURRENCY: &str = "USD";

/// exchangerate.host `/convert` endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeRateHost {
    http: HttpCaller,
    convert_url: Url,
}

impl ExchangeRateHost {
    pub fn new(http: HttpCaller, convert_url: &str) -> Result<Self> {
        let convert_url = Url::parse(convert_url)
            .with_context(|| format!("Invalid fx endpoint URL '{convert_url}'"))?;

        Ok(Self { http, convert_url })
    }
}

#[derive(Debug, Deserialize)]
struct XrConvertResponse {
    success: Option<bool>,
    result: Option<f64>,
    info: Option<XrInfo>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct XrInfo {
    rate: Option<f64>,
}

#[async_trait]
impl FxConverter for ExchangeRateHost {
    async fn convert(&self, from_currency: &str, amount: f64) -> Result<FxResult, CallError> {
        let from_currency = from_currency.trim();

        if from_currency.eq_ignore_ascii_case(TARGET_CURRENCY) {
            return Ok(FxResult::identity(amount));
        }
        if from_currency.is_empty() {
            return Err(CallError::parse(ServiceKind::Fx, "empty currency code"));
        }

        let parsed: XrConvertResponse = self
            .http
            .get_json(
                ServiceKind::Fx,
                &self.convert_url,
                &[
                    ("from", from_currency.to_string()),
                    ("to", TARGET_CURRENCY.to_string()),
                    ("amount", amount.to_string()),
                ],
            )
            .await?;

        if parsed.success == Some(false) {
            let reason = parsed.error.map(|e| e.to_string()).unwrap_or_else(|| "no details".to_string());
            return Err(CallError::parse(ServiceKind::Fx, format!("service reported failure: {reason}")));
        }

        let amount_usd = parsed
            .result
            .ok_or_else(|| CallError::parse(ServiceKind::Fx, "response has no result"))?;

        let rate_to_usd = parsed
            .info
            .and_then(|info| info.rate)
            .or_else(|| (amount > 0.0).then_some(amount_usd / amount))
            .ok_or_else(|| CallError::parse(ServiceKind::Fx, "rate missing and cannot be derived"))?;

        Ok(FxResult { rate_to_usd, amount_usd })
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::{
    error::{CallError, CallErrorKind},
    provider::ServiceKind,
};

/// Upper bound for a single outbound call, whatever the configuration says.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues single-attempt GET requests with a hard timeout.
#[derive(Debug, Clone)]
pub struct HttpCaller {
    http: Client,
    timeout: Duration,
}

impl HttpCaller {
    pub fn new(timeout: Duration) -> Result<Self> {
        let timeout = timeout.min(MAX_TIMEOUT);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with `params` as the query string and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        service: ServiceKind,
        url: &Url,
        params: &[(&str, String)],
    ) -> Result<T, CallError> {
        match tokio::time::timeout(self.timeout, self.fetch(service, url, params)).await {
            Ok(res) => res,
            Err(_) => Err(CallError::timeout(service, self.timeout)),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        service: ServiceKind,
        url: &Url,
        params: &[(&str, String)],
    ) -> Result<T, CallError> {
        let res = self
            .http
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(|e| CallError::from_transport(service, e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| CallError::from_transport(service, e))?;

        if !status.is_success() {
            return Err(CallError::new(
                service,
                CallErrorKind::Http,
                format!("request failed with status {}: {}", status, truncate_body(&body)),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| CallError::parse(service, format!("unexpected response body: {e}")))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    #[derive(Debug, Deserialize)]
    struct Echo {
        value: f64,
    }

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[test]
    fn timeout_is_capped() {
        let caller = HttpCaller::new(Duration::from_secs(60)).unwrap();
        assert_eq!(caller.timeout(), MAX_TIMEOUT);
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[tokio::test]
    async fn decodes_json_and_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/echo"))
            .and(query_param("q", "x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": 1.5 })))
            .expect(1)
            .mount(&server)
            .await;

        let caller = HttpCaller::new(Duration::from_secs(2)).unwrap();
        let echo: Echo = caller
            .get_json(ServiceKind::Geocode, &url(&server, "/echo"), &[("q", "x".to_string())])
            .await
            .expect("call should succeed");

        assert_eq!(echo.value, 1.5);
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let caller = HttpCaller::new(Duration::from_secs(2)).unwrap();
        let err = caller
            .get_json::<Echo>(ServiceKind::Weather, &url(&server, "/x"), &[])
            .await
            .unwrap_err();

        assert_eq!(err.kind, CallErrorKind::Http);
        assert_eq!(err.service, ServiceKind::Weather);
        assert!(err.detail.contains("503"));
        assert!(err.detail.contains("upstream down"));
    }

    #[tokio::test]
    async fn garbage_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let caller = HttpCaller::new(Duration::from_secs(2)).unwrap();
        let err = caller
            .get_json::<Echo>(ServiceKind::Fx, &url(&server, "/x"), &[])
            .await
            .unwrap_err();

        assert_eq!(err.kind, CallErrorKind::Parse);
    }

    #[tokio::test]
    async fn slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "value": 1.0 }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let caller = HttpCaller::new(Duration::from_millis(200)).unwrap();
        let err = caller
            .get_json::<Echo>(ServiceKind::Geocode, &url(&server, "/x"), &[])
            .await
            .unwrap_err();

        assert_eq!(err.kind, CallErrorKind::Timeout);
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // Grab a free port, then close it so the connection is refused.
        let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let target = Url::parse(&format!("http://{addr}/")).unwrap();

        let caller = HttpCaller::new(Duration::from_secs(2)).unwrap();
        let err = caller
            .get_json::<Echo>(ServiceKind::Geocode, &target, &[])
            .await
            .unwrap_err();

        assert_eq!(err.kind, CallErrorKind::Network);
    }
}

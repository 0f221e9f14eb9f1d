//! JSON-over-HTTP transport.
//!
//! Each service is a route under a base URL: a call is a `POST` of the JSON
//! request to `{base_url}/{service}`, answered with the JSON response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};

use super::service::{ServiceError, ServiceTransport};

/// Default base URL of the calibration service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8090";

/// Default timeout for a single service call in seconds.
///
/// Finalizing a calibration runs the optimizer on the service side and can
/// take a while.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub base_url: String,
    /// Timeout for a single call in seconds. 0 disables the timeout.
    pub timeout_secs: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpTransportConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Transport that reaches the calibration services over HTTP.
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build()?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn service_url(&self, service: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            service.trim_start_matches('/')
        )
    }
}

/// Render an error with all of its sources, outermost first.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[async_trait]
impl ServiceTransport for HttpTransport {
    async fn call(&self, service: &str, request: Value) -> Result<Value, ServiceError> {
        let url = self.service_url(service);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::new(service, error_chain(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::new(service, error_chain(&e)))?;

        if !status.is_success() {
            let message = if body.is_empty() {
                status.to_string()
            } else {
                body
            };
            return Err(ServiceError::new(service, message));
        }

        if body.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_str(&body)
            .map_err(|e| ServiceError::new(service, format!("invalid response body: {}", e)))
    }

    async fn is_available(&self, service: &str) -> bool {
        match self.client.get(self.service_url(service)).send().await {
            Ok(response) => response.status() != StatusCode::NOT_FOUND,
            Err(e) => {
                tracing::debug!(service, error = %e, "service probe failed");
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(base_url: &str) -> HttpTransport {
        HttpTransport::new(
            HttpTransportConfig::default()
                .with_base_url(base_url)
                .with_timeout(5),
        )
        .unwrap()
    }

    #[test]
    fn test_service_url_joins_with_single_slash() {
        let t = transport("http://robot:8090/");
        assert_eq!(t.service_url("record_calibration"), "http://robot:8090/record_calibration");
        assert_eq!(
            t.service_url("/camera/finalize_calibration"),
            "http://robot:8090/camera/finalize_calibration"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[tokio::test]
    async fn test_call_posts_json_to_service_route() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/finalize_calibration"))
            .and(body_json(json!({"store_calibration": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"residual_error": 0.5})))
            .expect(1)
            .mount(&server)
            .await;

        let reply = transport(&server.uri())
            .call("finalize_calibration", json!({"store_calibration": false}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"residual_error": 0.5}));
    }

    #[tokio::test]
    async fn test_namespaced_service_route() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/camera/record_calibration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let base_url = format!("{}/", server.uri());
        transport(&base_url)
            .call("/camera/record_calibration", json!({}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_success_body_is_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/record_calibration"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let reply = transport(&server.uri())
            .call("record_calibration", json!({}))
            .await
            .unwrap();
        assert_eq!(reply, json!({}));
    }

    #[tokio::test]
    async fn test_error_body_is_passed_through_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/finalize_calibration"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_string("Failed to finalize calibration. Not enough patterns."),
            )
            .mount(&server)
            .await;

        let err = transport(&server.uri())
            .call("finalize_calibration", json!({"store_calibration": true}))
            .await
            .unwrap_err();
        assert_eq!(err.service, "finalize_calibration");
        assert_eq!(err.message(), "Failed to finalize calibration. Not enough patterns.");
    }

    #[tokio::test]
    async fn test_empty_error_body_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = transport(&server.uri())
            .call("record_calibration", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "503 Service Unavailable");
    }

    #[tokio::test]
    async fn test_missing_route_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get_workspace_calibration"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        assert!(!transport(&server.uri()).is_available("get_workspace_calibration").await);
    }

    #[tokio::test]
    async fn test_any_other_status_is_available() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/initialize_calibration"))
            .respond_with(ResponseTemplate::new(405))
            .expect(1)
            .mount(&server)
            .await;

        assert!(transport(&server.uri()).is_available("initialize_calibration").await);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let t = transport(&base_url);
        assert!(!t.is_available("initialize_calibration").await);
        let err = t.call("initialize_calibration", json!({})).await.unwrap_err();
        assert_eq!(err.service, "initialize_calibration");
    }

    #[tokio::test]
    async fn test_zero_timeout_disables_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/record_calibration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let t = HttpTransport::new(
            HttpTransportConfig::default()
                .with_base_url(server.uri())
                .with_timeout(0),
        )
        .unwrap();
        assert_eq!(t.call("record_calibration", json!({})).await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_timeout_message_keeps_cause() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let t = HttpTransport::new(
            HttpTransportConfig::default()
                .with_base_url(server.uri())
                .with_timeout(1),
        )
        .unwrap();
        let err = t.call("finalize_calibration", json!({})).await.unwrap_err();
        assert!(err.message().contains("timed out"), "{}", err.message());
    }

    #[test]
    fn test_error_chain_includes_sources() {
        #[derive(Debug, thiserror::Error)]
        #[error("error sending request")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"));
        assert_eq!(error_chain(&err), "error sending request: connection refused");
    }
}

//! OSC Device Control Channel
//!
//! JSON-over-HTTP request primitive for the camera's GET/POST conventions.
//! No retries happen here; retry policy belongs to the caller.

use crate::error::OscError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Maximum number of body characters kept in error messages
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Default bound on a whole artifact download
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Header the device requires on every POST
const XSRF_HEADER: &str = "X-XSRF-Protected";

/// Request primitive the capture pipeline drives the camera through
#[async_trait]
pub trait DeviceChannel: Send + Sync {
    /// GET a device path and return its JSON body
    async fn get(&self, path: &str) -> Result<Value, OscError>;

    /// POST a JSON body (an empty object when `None`) to a device path
    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, OscError>;

    /// Fetch raw bytes from an absolute artifact URL
    async fn download(&self, url: &str) -> Result<Vec<u8>, OscError>;
}

#[async_trait]
impl<T: DeviceChannel + ?Sized> DeviceChannel for std::sync::Arc<T> {
    async fn get(&self, path: &str) -> Result<Value, OscError> {
        (**self).get(path).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, OscError> {
        (**self).post(path, body).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, OscError> {
        (**self).download(url).await
    }
}

/// Cut a response body down to an excerpt suitable for error messages
pub fn truncate_body(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

/// Parse a success body, degrading to an empty object
///
/// The device may answer with an empty or non-JSON body even on success.
/// This can hide a device-side fault; the degradation is logged.
fn parse_body(path: &str, text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            debug!(
                "Unparseable body from {} ({} bytes), using empty object: {}",
                path,
                text.len(),
                e
            );
            Value::Object(Map::new())
        }
    }
}

/// HTTP implementation of [`DeviceChannel`]
#[derive(Debug, Clone)]
pub struct HttpChannel {
    /// Base URL, e.g. `http://192.168.42.1`
    base_url: String,
    /// Timeout for JSON requests
    timeout: Duration,
    /// Timeout for a whole artifact download, body included
    download_timeout: Duration,
    client: reqwest::Client,
}

impl HttpChannel {
    /// Create a channel for the camera at `host`
    ///
    /// # Arguments
    /// * `host` - Bare host (`192.168.42.1`), `host:port`, or a full base URL
    /// * `timeout` - Per-request timeout for JSON calls, connect timeout for all calls
    pub fn new(host: &str, timeout: Duration) -> Result<Self, OscError> {
        let base_url = Self::base_url_for(host);
        info!("Creating OSC channel for {}", base_url);

        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| OscError::Transport {
                target: base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url,
            timeout,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            client,
        })
    }

    /// Bound artifact downloads by `timeout` instead of [`DEFAULT_DOWNLOAD_TIMEOUT`]
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    fn base_url_for(host: &str) -> String {
        let host = host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        }
    }

    pub fn download_timeout(&self) -> Duration {
        self.download_timeout
    }

    /// Base URL every device path is resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn finish(
        &self,
        method: &'static str,
        path: &str,
        response: reqwest::Response,
    ) -> Result<Value, OscError> {
        let status = response.status();
        let text = response.text().await.map_err(|e| OscError::Transport {
            target: path.to_string(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(OscError::Protocol {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        Ok(parse_body(path, &text))
    }
}

#[async_trait]
impl DeviceChannel for HttpChannel {
    async fn get(&self, path: &str) -> Result<Value, OscError> {
        debug!("OSC GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .timeout(self.timeout)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| OscError::Transport {
                target: path.to_string(),
                reason: e.to_string(),
            })?;

        self.finish("GET", path, response).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, OscError> {
        debug!("OSC POST {}", path);
        let body = body.unwrap_or_else(|| Value::Object(Map::new()));
        let payload = serde_json::to_vec(&body)?;

        let response = self
            .client
            .post(self.url(path))
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json;charset=utf-8")
            .header(ACCEPT, "application/json")
            .header(XSRF_HEADER, "1")
            .body(payload)
            .send()
            .await
            .map_err(|e| OscError::Transport {
                target: path.to_string(),
                reason: e.to_string(),
            })?;

        self.finish("POST", path, response).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, OscError> {
        debug!("Downloading artifact {}", url);
        let transport = |e: reqwest::Error| OscError::Transport {
            target: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OscError::Download {
                url: url.to_string(),
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn channel_for(server: &MockServer) -> HttpChannel {
        HttpChannel::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(HttpChannel::base_url_for("192.168.42.1"), "http://192.168.42.1");
        assert_eq!(HttpChannel::base_url_for("cam.local:8080/"), "http://cam.local:8080");
        assert_eq!(
            HttpChannel::base_url_for("https://cam.local"),
            "https://cam.local"
        );
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(500);
        let excerpt = truncate_body(&long);
        assert_eq!(excerpt.chars().count(), BODY_EXCERPT_CHARS);
        assert_eq!(truncate_body("short"), "short");
    }

    #[tokio::test]
    async fn test_get_parses_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/osc/info"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"model": "X3"})))
            .expect(1)
            .mount(&server)
            .await;

        let info = channel_for(&server).await.get("/osc/info").await.unwrap();
        assert_eq!(info["model"], "X3");
    }

    #[tokio::test]
    async fn test_post_sends_protection_header_and_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/osc/state"))
            .and(header("X-XSRF-Protected", "1"))
            .and(header("content-type", "application/json;charset=utf-8"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let state = channel_for(&server).await.post("/osc/state", None).await.unwrap();
        assert!(state.get("state").is_some());
    }

    #[tokio::test]
    async fn test_success_with_unparseable_body_is_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/osc/commands/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/osc/info"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let channel = channel_for(&server).await;
        let executed = channel
            .post("/osc/commands/execute", Some(json!({"name": "x"})))
            .await
            .unwrap();
        assert_eq!(executed, json!({}));
        assert_eq!(channel.get("/osc/info").await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_non_success_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/osc/commands/execute"))
            .respond_with(ResponseTemplate::new(400).set_body_string("x".repeat(1000)))
            .mount(&server)
            .await;

        let err = channel_for(&server)
            .await
            .post("/osc/commands/execute", None)
            .await
            .unwrap_err();

        match err {
            OscError::Protocol {
                method,
                path,
                status,
                body,
            } => {
                assert_eq!(method, "POST");
                assert_eq!(path, "/osc/commands/execute");
                assert_eq!(status, 400);
                assert_eq!(body.len(), BODY_EXCERPT_CHARS);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_with_json_body_still_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/osc/info"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"error": {"code": "busy"}})),
            )
            .mount(&server)
            .await;

        let err = channel_for(&server).await.get("/osc/info").await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_download_bytes_and_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/DCIM/100/IMG.JPG"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/DCIM/100/GONE.JPG"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let channel = channel_for(&server).await;
        let bytes = channel
            .download(&format!("{}/DCIM/100/IMG.JPG", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);

        let err = channel
            .download(&format!("{}/DCIM/100/GONE.JPG", server.uri()))
            .await
            .unwrap_err();
        match err {
            OscError::Download { status, body, .. } => {
                assert_eq!(status, 404);
                assert_eq!(body, "not found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stalled_download_is_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/DCIM/100/IMG.JPG"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0xFF, 0xD8])
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let channel = HttpChannel::new(&server.uri(), Duration::from_millis(500))
            .unwrap()
            .with_download_timeout(Duration::from_millis(300));
        let started = std::time::Instant::now();
        let err = channel
            .download(&format!("{}/DCIM/100/IMG.JPG", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, OscError::Transport { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_device_is_transport_error() {
        let channel = HttpChannel::new("127.0.0.1:1", Duration::from_millis(500)).unwrap();
        let err = channel.get("/osc/info").await.unwrap_err();
        assert!(matches!(err, OscError::Transport { .. }));
        assert_eq!(err.status(), None);
    }
}

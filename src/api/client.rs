//! HTTP implementation of the control calls.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::{ControlAck, ControlApi};
use crate::config::BackendConfig;
use crate::error::ApiError;
use crate::types::{Module, Scalar};

/// Header that suppresses the ngrok browser interstitial on tunneled backends.
const NGROK_SKIP_HEADER: &str = "ngrok-skip-browser-warning";

pub struct HttpControlApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    start_path: String,
    approve_path: String,
    abort_path: String,
    health_path: String,
}

impl HttpControlApi {
    pub fn new(config: &BackendConfig) -> Self {
        // Fall back to reqwest defaults if builder creation fails for any reason.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: config.api_base_url.trim().trim_end_matches('/').to_string(),
            token: config
                .auth_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            start_path: config.start_path.clone(),
            approve_path: config.approve_path.clone(),
            abort_path: config.abort_path.clone(),
            health_path: config.health_path.clone(),
        }
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        with_auth: bool,
    ) -> Result<ControlAck, ApiError> {
        if self.base_url.is_empty() {
            return Err(ApiError::NotConfigured(
                "backend.api_base_url is not set (TAYKA_API_URL)".to_string(),
            ));
        }
        let url = join_url(&self.base_url, path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(NGROK_SKIP_HEADER, "true");
        if with_auth {
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        tracing::debug!(method = %method, url = %url, "control call");
        let response = request.send().await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(ApiError::Status {
                code: status.as_u16(),
                message: backend_message(&text),
            });
        }
        Ok(ControlAck::from_body(&text))
    }
}

#[async_trait]
impl ControlApi for HttpControlApi {
    async fn start_run(&self, seed: Option<Scalar>) -> Result<ControlAck, ApiError> {
        let mut body = Map::new();
        if let Some(seed) = seed {
            body.insert("seed".to_string(), seed.to_json());
        }
        self.call(Method::POST, &self.start_path, Some(Value::Object(body)), true)
            .await
    }

    async fn approve(&self, module: Module) -> Result<ControlAck, ApiError> {
        let body = json!({ "selectedModule": module.wire_name() });
        self.call(Method::POST, &self.approve_path, Some(body), true)
            .await
    }

    async fn abort(&self) -> Result<ControlAck, ApiError> {
        self.call(Method::POST, &self.abort_path, Some(json!({})), true)
            .await
    }

    async fn health(&self) -> Result<ControlAck, ApiError> {
        // Health is reachable without credentials.
        self.call(Method::GET, &self.health_path, None, false).await
    }
}

/// Join base URL and path without doubling an `/api` prefix.
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim();
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    let path = match path.strip_prefix("/api") {
        Some(rest) if base.ends_with("/api") && rest.starts_with('/') => rest.to_string(),
        _ => path,
    };
    format!("{base}{path}")
}

/// Prefer a JSON `message` field, else the raw body.
fn backend_message(body: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        if let Some(message) = obj.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn backend_config(base_url: String, token: Option<&str>) -> BackendConfig {
        BackendConfig {
            api_base_url: base_url,
            auth_token: token.map(str::to_string),
            ..BackendConfig::default()
        }
    }

    /// Serve one canned response and hand back the raw request text.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf = vec![0u8; 8192];
            let n = stream.read(&mut buf).await.expect("read request");
            stream
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (format!("http://{addr}"), server)
    }

    #[test]
    fn join_url_drops_duplicate_api_prefix() {
        assert_eq!(
            join_url("https://x.test/api/", "/api/sim/start"),
            "https://x.test/api/sim/start"
        );
        assert_eq!(
            join_url("https://x.test", "/api/sim/start"),
            "https://x.test/api/sim/start"
        );
        assert_eq!(join_url("https://x.test/api", "health"), "https://x.test/api/health");
        assert_eq!(
            join_url("https://x.test/api", "/apiary"),
            "https://x.test/api/apiary"
        );
    }

    #[tokio::test]
    async fn approve_sends_wire_module_with_bearer_and_ngrok_headers() {
        let (base, server) = serve_once(concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: 11\r\n",
            "Connection: close\r\n",
            "\r\n",
            "{\"ok\":true}"
        ))
        .await;
        let api = HttpControlApi::new(&backend_config(base, Some("secret")));
        let ack = api.approve(Module::Karma).await.expect("approve ok");
        assert_eq!(ack.body, json!({"ok": true}));

        let request = server.await.expect("server task").to_ascii_lowercase();
        assert!(request.starts_with("post /api/sim/approve "), "got: {request}");
        assert!(request.contains("authorization: bearer secret"));
        assert!(request.contains("ngrok-skip-browser-warning: true"));
        assert!(request.contains("{\"selectedmodule\":\"mixed\"}"));
    }

    #[tokio::test]
    async fn health_skips_credentials() {
        let (base, server) = serve_once(concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Length: 2\r\n",
            "Connection: close\r\n",
            "\r\n",
            "ok"
        ))
        .await;
        let api = HttpControlApi::new(&backend_config(base, Some("secret")));
        let ack = api.health().await.expect("health ok");
        assert_eq!(ack.summary(), "ok");
        let request = server.await.expect("server task").to_ascii_lowercase();
        assert!(request.starts_with("get /health "), "got: {request}");
        assert!(!request.contains("authorization:"));
    }

    #[tokio::test]
    async fn start_failure_carries_backend_message() {
        let (base, server) = serve_once(concat!(
            "HTTP/1.1 409 Conflict\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: 40\r\n",
            "Connection: close\r\n",
            "\r\n",
            "{\"message\":\"simulation already running\"}"
        ))
        .await;
        let api = HttpControlApi::new(&backend_config(base, None));
        let err = api
            .start_run(Some(Scalar::Number(42.0)))
            .await
            .expect_err("conflict");
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(err.operator_message(), "simulation already running");
        let request = server.await.expect("server task");
        assert!(request.contains("{\"seed\":42.0}"), "got: {request}");
    }

    #[tokio::test]
    async fn missing_base_url_is_reported_without_network() {
        let api = HttpControlApi::new(&BackendConfig::default());
        let err = api.abort().await.expect_err("not configured");
        assert!(matches!(err, ApiError::NotConfigured(_)));
    }
}

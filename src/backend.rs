//! Loopback HTTP client for the local inference backend.
//!
//! `health()` and `capture()` never fail across this boundary: transport
//! errors come back as `{status: "error", error: ...}` reports. Chat goes
//! through a [`ChatTransport`] so the echo fallback and a real `/chat`
//! endpoint are interchangeable without touching callers.

use std::sync::Arc;

use futures::channel::oneshot;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::{BackendConfig, ChatMode};
use crate::error::BackendError;

/// `{status, error?}` as returned by `/health`, or synthesized on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn error(err: &BackendError) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(err.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// `/capture` payload: active window title plus a base64 JPEG snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub status: String,
    #[serde(default)]
    pub window: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptureReport {
    pub fn error(err: &BackendError) -> Self {
        Self {
            status: "error".to_string(),
            window: None,
            image: None,
            error: Some(err.to_string()),
        }
    }
}

/// Produces the model's reply for one user turn.
pub trait ChatTransport: Send + Sync {
    fn reply(&self, text: &str) -> Result<String, BackendError>;
}

/// Local fallback: answers with the submitted text.
pub struct EchoTransport;

impl ChatTransport for EchoTransport {
    fn reply(&self, text: &str) -> Result<String, BackendError> {
        Ok(text.to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

/// `POST {base}/chat` with `{text}`, expecting `{response}`.
pub struct HttpTransport {
    http: Client,
    url: String,
    timeout_secs: u64,
}

impl ChatTransport for HttpTransport {
    fn reply(&self, text: &str) -> Result<String, BackendError> {
        let timeout_secs = self.timeout_secs;
        let response = self
            .http
            .post(&self.url)
            .json(&ChatRequest { text })
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| BackendError::from_reqwest(e, timeout_secs))?;
        let body: ChatResponse = response
            .json()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(body.response)
    }
}

pub struct BackendClient {
    http: Client,
    base_url: String,
    timeout_secs: u64,
    chat: Box<dyn ChatTransport>,
}

impl BackendClient {
    /// Build a client with the transport selected by `config.chat`.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let timeout_secs = config.timeout().as_secs();
        let chat: Box<dyn ChatTransport> = match config.chat {
            ChatMode::Echo => Box::new(EchoTransport),
            ChatMode::Http => Box::new(HttpTransport {
                http: http.clone(),
                url: format!("{base_url}/chat"),
                timeout_secs,
            }),
        };
        Ok(Self {
            http,
            base_url,
            timeout_secs,
            chat,
        })
    }

    /// Replace the chat transport, keeping the same base URL and timeout.
    #[cfg(test)]
    pub fn with_transport(mut self, chat: Box<dyn ChatTransport>) -> Self {
        self.chat = chat;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let timeout_secs = self.timeout_secs;
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| BackendError::from_reqwest(e, timeout_secs))?;
        response
            .json()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// `GET /health`.
    pub fn health(&self) -> StatusReport {
        match self.get_json::<StatusReport>("/health") {
            Ok(report) => report,
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                StatusReport::error(&e)
            }
        }
    }

    /// `GET /capture`.
    pub fn capture(&self) -> CaptureReport {
        match self.get_json::<CaptureReport>("/capture") {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "capture failed");
                CaptureReport::error(&e)
            }
        }
    }

    pub fn chat(&self, text: &str) -> Result<String, BackendError> {
        self.chat.reply(text)
    }
}

/// Run a blocking backend call on its own thread and await the result from
/// the UI executor without blocking it.
pub(crate) async fn off_thread<T, F>(f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.await.ok()
}

pub(crate) async fn chat(client: Arc<BackendClient>, text: String) -> Result<String, BackendError> {
    off_thread(move || client.chat(&text))
        .await
        .unwrap_or(Err(BackendError::Dropped))
}

pub(crate) async fn health(client: Arc<BackendClient>) -> StatusReport {
    off_thread(move || client.health())
        .await
        .unwrap_or_else(|| StatusReport::error(&BackendError::Dropped))
}

pub(crate) async fn capture(client: Arc<BackendClient>) -> CaptureReport {
    off_thread(move || client.capture())
        .await
        .unwrap_or_else(|| CaptureReport::error(&BackendError::Dropped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, chat: ChatMode) -> BackendConfig {
        BackendConfig {
            base_url: base_url.to_string(),
            timeout_secs: 1,
            chat,
            ..BackendConfig::default()
        }
    }

    /// reqwest's blocking client must not be built or dropped on a runtime
    /// worker, so every call goes through `spawn_blocking`.
    async fn blocking<T: Send + 'static>(
        config: BackendConfig,
        f: impl FnOnce(&BackendClient) -> T + Send + 'static,
    ) -> T {
        tokio::task::spawn_blocking(move || {
            let client = BackendClient::new(&config).unwrap();
            f(&client)
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn health_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
            .mount(&server)
            .await;

        let report = blocking(config(&server.uri(), ChatMode::Echo), |c| c.health()).await;
        assert!(report.is_ok());
        assert_eq!(report.error, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn health_500_becomes_error_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let report = blocking(config(&server.uri(), ChatMode::Echo), |c| c.health()).await;
        assert_eq!(report.status, "error");
        assert!(report.error.unwrap().contains("500"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn health_timeout_is_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "ok"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let report = blocking(config(&server.uri(), ChatMode::Echo), |c| c.health()).await;
        assert_eq!(report.status, "error");
        assert!(report.error.unwrap().contains("timed out"));
    }

    #[test]
    fn unreachable_backend_reports_error() {
        let client = BackendClient::new(&config("http://127.0.0.1:1", ChatMode::Echo)).unwrap();
        let report = client.health();
        assert_eq!(report.status, "error");
        assert!(report.error.is_some());

        let capture = client.capture();
        assert_eq!(capture.status, "error");
        assert_eq!(capture.window, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn capture_reads_window_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/capture"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "window": "main.rs - editor",
                "image": "aGVsbG8="
            })))
            .mount(&server)
            .await;

        let report = blocking(config(&server.uri(), ChatMode::Echo), |c| c.capture()).await;
        assert_eq!(report.status, "ok");
        assert_eq!(report.window.as_deref(), Some("main.rs - editor"));
        assert_eq!(report.image.as_deref(), Some("aGVsbG8="));
    }

    #[test]
    fn echo_transport_replies_with_input() {
        let client = BackendClient::new(&config("http://127.0.0.1:1", ChatMode::Echo)).unwrap();
        assert_eq!(client.chat("hello").unwrap(), "hello");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn http_transport_posts_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(serde_json::json!({"text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "hi"})))
            .expect(1)
            .mount(&server)
            .await;

        let reply = blocking(config(&server.uri(), ChatMode::Http), |c| c.chat("hello")).await;
        assert_eq!(reply.unwrap(), "hi");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn http_transport_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"nope": 1})))
            .mount(&server)
            .await;

        let reply = blocking(config(&server.uri(), ChatMode::Http), |c| c.chat("hello")).await;
        assert!(matches!(reply, Err(BackendError::Decode(_))));
    }

    #[test]
    fn custom_transport_needs_no_caller_changes() {
        struct Fixed;
        impl ChatTransport for Fixed {
            fn reply(&self, _text: &str) -> Result<String, BackendError> {
                Ok("fixed".to_string())
            }
        }
        let client = BackendClient::new(&config("http://127.0.0.1:1/", ChatMode::Echo))
            .unwrap()
            .with_transport(Box::new(Fixed));
        assert_eq!(client.base_url(), "http://127.0.0.1:1");
        assert_eq!(client.chat("anything").unwrap(), "fixed");
    }

    #[test]
    fn off_thread_chat_resolves() {
        let client = Arc::new(
            BackendClient::new(&config("http://127.0.0.1:1", ChatMode::Echo)).unwrap(),
        );
        let reply = futures::executor::block_on(chat(client, "ping".to_string()));
        assert_eq!(reply.unwrap(), "ping");
    }
}

//! HTTP client for the Anthropic Messages API

use crate::anthropic::types::{MessagesRequest, MessagesResponse, error_message};
use qcforge_application::GatewayError;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 8000;

/// Longest wait between rate-limit retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Errors from the Messages API
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("cannot reach {url}: {message}")]
    Connection { url: String, message: String },

    #[error("rate limited ({status}) after {attempts} attempts: {message}")]
    RateLimited {
        status: u16,
        attempts: u32,
        message: String,
    },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response body: {0}")]
    InvalidResponse(String),

    #[error("request timed out")]
    Timeout,
}

impl From<LlmError> for GatewayError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Authentication { .. } => GatewayError::Authentication(err.to_string()),
            LlmError::Connection { .. } => GatewayError::ConnectionError(err.to_string()),
            LlmError::RateLimited { .. } => GatewayError::RateLimited(err.to_string()),
            LlmError::Api { status, message } => GatewayError::ApiError { status, message },
            LlmError::InvalidResponse(msg) => GatewayError::InvalidResponse(msg),
            LlmError::Timeout => GatewayError::Timeout,
        }
    }
}

/// Connection settings for [`AnthropicClient`]
#[derive(Clone)]
pub struct AnthropicSettings {
    pub api_key: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    pub max_retries: u32,
    /// Base delay for exponential backoff when no `retry-after` is sent
    pub retry_base_delay: Duration,
}

impl AnthropicSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: Duration::from_secs(300),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(2),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for AnthropicSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Stateless Messages API client; sessions carry the history.
pub struct AnthropicClient {
    http: reqwest::Client,
    settings: AnthropicSettings,
}

impl AnthropicClient {
    pub fn new(settings: AnthropicSettings) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| LlmError::Connection {
                url: settings.base_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { http, settings })
    }

    pub fn max_tokens(&self) -> u32 {
        self.settings.max_tokens
    }

    /// `POST /v1/messages`, retrying 429/529 up to `max_retries` times.
    pub async fn create_message(
        &self,
        request: &MessagesRequest<'_>,
    ) -> Result<MessagesResponse, LlmError> {
        let url = self.settings.messages_url();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(
                model = request.model,
                messages = request.messages.len(),
                tools = request.tools.len(),
                attempt,
                "Calling Anthropic Messages API"
            );

            let response = self
                .http
                .post(&url)
                .header("x-api-key", &self.settings.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        LlmError::Timeout
                    } else {
                        LlmError::Connection {
                            url: url.clone(),
                            message: e.to_string(),
                        }
                    }
                })?;

            let status = response.status();
            let retry_after = retry_after(response.headers());
            let body = response.text().await.map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::InvalidResponse(e.to_string())
                }
            })?;

            if status.is_success() {
                debug!("Anthropic response: {} bytes", body.len());
                return serde_json::from_str(&body)
                    .map_err(|e| LlmError::InvalidResponse(e.to_string()));
            }

            let message = error_message(&body);
            match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(LlmError::Authentication {
                        status: status.as_u16(),
                        message,
                    });
                }
                s if is_retryable(s) => {
                    if attempt > self.settings.max_retries {
                        return Err(LlmError::RateLimited {
                            status: s.as_u16(),
                            attempts: attempt,
                            message,
                        });
                    }
                    let delay = retry_after
                        .unwrap_or_else(|| self.settings.retry_base_delay * 2u32.pow(attempt - 1))
                        .min(MAX_RETRY_DELAY);
                    warn!(
                        "Anthropic returned {} ({}); retrying in {:?}",
                        s.as_u16(),
                        message,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                s => {
                    return Err(LlmError::Api {
                        status: s.as_u16(),
                        message,
                    });
                }
            }
        }
    }
}

/// 429 Too Many Requests and 529 Overloaded
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 529
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Minimal HTTP/1.1 server answering with canned responses in order.

    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub struct Canned {
        pub status: u16,
        pub headers: Vec<(&'static str, &'static str)>,
        pub body: String,
    }

    impl Canned {
        pub fn json(status: u16, body: serde_json::Value) -> Self {
            Self {
                status,
                headers: vec![],
                body: body.to_string(),
            }
        }

        pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
            self.headers.push((name, value));
            self
        }
    }

    /// Raw requests (head + body) received so far
    pub type Seen = Arc<Mutex<Vec<String>>>;

    pub async fn start(responses: Vec<Canned>) -> (String, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let seen_bg = Arc::clone(&seen);

        tokio::spawn(async move {
            for canned in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut stream).await;
                seen_bg.lock().unwrap().push(request);

                let mut out = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n",
                    canned.status,
                    canned.body.len()
                );
                for (name, value) in &canned.headers {
                    out.push_str(&format!("{}: {}\r\n", name, value));
                }
                out.push_str("\r\n");
                out.push_str(&canned.body);
                let _ = stream.write_all(out.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{}", addr), seen)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::ndjson::process_ndjson;
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{ChatRequest, Message, ModelListResponse, ModelName, StreamChunk};

/// Default base URL of a locally-hosted model server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// A boxed stream of decoded chat chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// The model-serving operations the REPL depends on.
///
/// [`Ollama`] is the production implementation; tests substitute in-memory
/// backends.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Lists the models installed on the host, sorted ascending.
    async fn list_models(&self) -> Result<Vec<ModelName>>;

    /// Opens a streaming chat over `messages` with the active model.
    ///
    /// The returned stream yields chunks in arrival order.  The caller
    /// concatenates fragments and stops at the final chunk or at the end of
    /// the stream.
    async fn chat(&self, messages: &[Message]) -> Result<ChunkStream>;

    /// The active model.
    fn model(&self) -> &str;

    /// Replaces the active model.  No validation happens here.
    fn set_model(&mut self, model: ModelName);

    /// Verifies that the host answers and serves the active model.
    ///
    /// A missing model yields [`Error::ModelNotFound`] carrying the full list
    /// so the caller can present it without another round trip.  Any other
    /// failure is wrapped as a connection error.
    async fn check_reachable(&self) -> Result<()> {
        let models = self.list_models().await.map_err(|e| {
            Error::connection(
                format!("cannot reach model server: {e}"),
                Some(Box::new(e)),
            )
        })?;
        if models.iter().any(|name| name == self.model()) {
            Ok(())
        } else {
            Err(Error::model_not_found(self.model(), models))
        }
    }
}

/// Client for an Ollama-compatible model server.
#[derive(Debug, Clone)]
pub struct Ollama {
    client: ReqwestClient,
    base_url: String,
    model: ModelName,
    list_timeout: Duration,
}

impl Ollama {
    /// Create a new client for `base_url` using `model`.
    ///
    /// A trailing slash on `base_url` is ignored.
    pub fn new(base_url: impl Into<String>, model: impl Into<ModelName>) -> Result<Self> {
        Self::with_options(base_url, model, None)
    }

    /// Create a new client with a custom timeout for model listing.
    ///
    /// Chat requests have no overall timeout; a local model may take a long
    /// time to finish and the stream is consumed incrementally.
    pub fn with_options(
        base_url: impl Into<String>,
        model: impl Into<ModelName>,
        list_timeout: Option<Duration>,
    ) -> Result<Self> {
        let client = ReqwestClient::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            model: model.into(),
            list_timeout: list_timeout.unwrap_or(DEFAULT_LIST_TIMEOUT),
        })
    }

    /// The base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.list_timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("{}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        let status_code = response.status().as_u16();

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or(error_body);
        Error::api(status_code, message)
    }
}

#[async_trait::async_trait]
impl Backend for Ollama {
    async fn list_models(&self) -> Result<Vec<ModelName>> {
        let url = format!("{}/api/tags", self.base_url);
        CLIENT_REQUESTS.click();
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .headers(self.default_headers())
            .timeout(self.list_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let body = response.json::<ModelListResponse>().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            Error::serialization(
                format!("Failed to parse model list: {}", e),
                Some(Box::new(e)),
            )
        })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        tracing::debug!(count = body.models().len(), "listed models");
        Ok(body.sorted_names())
    }

    async fn chat(&self, messages: &[Message]) -> Result<ChunkStream> {
        let url = format!("{}/api/chat", self.base_url);
        CLIENT_REQUESTS.click();
        let start = Instant::now();

        let mut headers = self.default_headers();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/x-ndjson"),
        );

        let request = ChatRequest::streaming(&self.model, messages);
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        tracing::debug!(model = %self.model, messages = messages.len(), "chat stream opened");

        Ok(Box::pin(process_ndjson(response.bytes_stream())))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn set_model(&mut self, model: ModelName) {
        self.model = model;
    }
}

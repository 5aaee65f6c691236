//! HTTP client for the WayraScope analysis backend
//!
//! The orchestrators only see the [`WeatherBackend`] trait. [`HttpBackend`] is
//! the production implementation: every non-2xx response and transport failure
//! is normalized into a single [`WayraError::Api`] carrying a readable message,
//! the HTTP status and the raw body.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::RetryTransientMiddleware;
use reqwest_retry::policies::ExponentialBackoff;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ApiConfig;
use crate::download::{DownloadPayload, fallback_filename, parse_content_disposition, parse_meta_header};
use crate::i18n::{Language, Messages};
use crate::models::{
    AnalyzeCoordsRequest, AnalyzeRequest, AnalyzeResponse, DownloadRequest, HourlyRequest,
    HourlyResponse,
};
use crate::{Result, WayraError};

/// Header carrying opaque export metadata
pub const META_HEADER: &str = "x-wayrameta";

/// Remote operations the orchestrators depend on
#[async_trait]
pub trait WeatherBackend: Send + Sync {
    /// `POST /analyze`
    async fn analyze_city(&self, body: &AnalyzeRequest) -> Result<AnalyzeResponse>;

    /// `POST /analyze/coords`
    async fn analyze_coords(&self, body: &AnalyzeCoordsRequest) -> Result<AnalyzeResponse>;

    /// `GET /weather/hourly`
    async fn hourly(&self, request: &HourlyRequest) -> Result<HourlyResponse>;

    /// `GET /download`
    async fn download(&self, request: &DownloadRequest) -> Result<DownloadPayload>;
}

/// Human-readable message for a failed response.
///
/// A structured `detail` field wins, then the fixed gateway message for 502,
/// then `fallback` (the transport's own message).
#[must_use]
pub fn normalize_error_message(
    status: Option<u16>,
    details: Option<&Value>,
    fallback: &str,
    messages: &Messages,
) -> String {
    let detail = details
        .and_then(Value::as_object)
        .and_then(|body| body.get("detail"))
        .filter(|detail| !detail.is_null());

    match (detail, status) {
        (Some(Value::String(detail)), _) => detail.clone(),
        (Some(detail), _) => detail.to_string(),
        (None, Some(502)) => messages.gateway.to_string(),
        (None, _) if fallback.trim().is_empty() => messages.network.to_string(),
        (None, _) => fallback.to_string(),
    }
}

/// [`WeatherBackend`] over HTTP
pub struct HttpBackend {
    /// Plain client, used to build requests
    http: Client,
    /// Client with the retry stack, used to send them
    client: ClientWithMiddleware,
    base_url: String,
    language: Language,
}

impl HttpBackend {
    /// Create a new backend client from the API settings
    pub fn new(config: &ApiConfig, language: Language) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("WayraScope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WayraError::config(format!("Failed to create HTTP client: {e}")))?;

        let mut builder = ClientBuilder::new(http.clone());
        if config.max_retries > 0 {
            let retry_policy =
                ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            http,
            client: builder.build(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn build_error(e: &reqwest::Error) -> WayraError {
        WayraError::api(format!("Failed to build request: {e}"))
    }

    /// Sends a request and normalizes any failure
    async fn send(&self, request: Request) -> Result<Response> {
        let messages = self.language.messages();
        debug!(method = %request.method(), url = %request.url(), "Sending backend request");

        let response = self.client.execute(request).await.map_err(|e| {
            error!(error = %e, "Backend request failed");
            WayraError::api(normalize_error_message(None, None, &e.to_string(), messages))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let details = if body.is_empty() {
            None
        } else {
            Some(
                serde_json::from_slice::<Value>(&body)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned())),
            )
        };
        let fallback = format!("Request failed with status code {}", status.as_u16());
        let message =
            normalize_error_message(Some(status.as_u16()), details.as_ref(), &fallback, messages);

        warn!(status = status.as_u16(), %message, "Backend returned an error");
        Err(WayraError::api_with_status(message, Some(status.as_u16()), details))
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| WayraError::api(format!("Failed to read {what} response: {e}")))?;

        serde_json::from_slice(&body).map_err(|e| {
            error!(error = %e, "Failed to parse {what} response");
            WayraError::api_with_status(format!("Invalid {what} response: {e}"), Some(status), None)
        })
    }
}

#[async_trait]
impl WeatherBackend for HttpBackend {
    #[instrument(skip(self, body), fields(city = %body.city, date = %body.date))]
    async fn analyze_city(&self, body: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        let start_time = Instant::now();
        let request = self
            .http
            .post(self.url("/analyze"))
            .json(body)
            .build()
            .map_err(|e| Self::build_error(&e))?;

        let response = self.send(request).await?;
        let analysis: AnalyzeResponse = Self::decode(response, "analyze").await?;
        debug!(elapsed_ms = start_time.elapsed().as_millis() as u64, "Analyze response decoded");
        Ok(analysis)
    }

    #[instrument(skip(self, body), fields(lat = body.lat, lon = body.lon, date = %body.date))]
    async fn analyze_coords(&self, body: &AnalyzeCoordsRequest) -> Result<AnalyzeResponse> {
        let start_time = Instant::now();
        let request = self
            .http
            .post(self.url("/analyze/coords"))
            .json(body)
            .build()
            .map_err(|e| Self::build_error(&e))?;

        let response = self.send(request).await?;
        let analysis: AnalyzeResponse = Self::decode(response, "analyze").await?;
        debug!(elapsed_ms = start_time.elapsed().as_millis() as u64, "Analyze response decoded");
        Ok(analysis)
    }

    #[instrument(skip(self, request), fields(lat = request.lat, lon = request.lon, date = %request.date))]
    async fn hourly(&self, request: &HourlyRequest) -> Result<HourlyResponse> {
        let http_request = self
            .http
            .get(self.url("/weather/hourly"))
            .query(&request.query_pairs())
            .build()
            .map_err(|e| Self::build_error(&e))?;

        let response = self.send(http_request).await?;
        Self::decode(response, "hourly").await
    }

    #[instrument(skip(self, request), fields(date = %request.date, fmt = request.format.extension()))]
    async fn download(&self, request: &DownloadRequest) -> Result<DownloadPayload> {
        let http_request = self
            .http
            .get(self.url("/download"))
            .query(&request.query_pairs())
            .build()
            .map_err(|e| Self::build_error(&e))?;

        let response = self.send(http_request).await?;
        let headers = response.headers();

        let filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_disposition)
            .unwrap_or_else(|| fallback_filename(request));
        let meta = headers
            .get(META_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_meta_header);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(request.format.default_content_type())
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WayraError::api(format!("Failed to read download: {e}")))?
            .to_vec();

        info!(%filename, bytes = bytes.len(), "Download received");
        Ok(DownloadPayload {
            filename,
            content_type,
            bytes,
            meta,
        })
    }
}

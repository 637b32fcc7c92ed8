//! HTTP client wrapper with request/response interceptors.
//!
//! Every call goes through the same three steps:
//! 1. request interceptor: log the call, force JSON content type on
//!    POST/PUT/PATCH;
//! 2. send with the configured timeout;
//! 3. response interceptor: normalize to `data` or [`ApiError`], and on
//!    failure log + notify.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here panics or returns a bare `reqwest::Error`; every failure is
//! already normalized when it reaches the caller.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::normalize::{self, ApiError};
use super::notify::{LogNotifier, Notifier};
use crate::config::ClientConfig;

/// Configured transport for the registration backend. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    /// Build a client that reports failures through [`LogNotifier`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_notifier(config, Arc::new(LogNotifier))
    }

    /// Build a client with a caller-supplied notification channel.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] if the HTTP client cannot be constructed.
    pub fn with_notifier(config: &ClientConfig, notifier: Arc<dyn Notifier>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Request { message: format!("HTTP client build failed: {e}") })?;
        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(Self { http, base_url, notifier })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request to `{base_url}{path}` and decode the envelope's `data` as `T`.
    ///
    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] for business, HTTP, network,
    /// request, and decode failures. The notifier has already been called.
    pub async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        self.request_url(method, url, body).await
    }

    /// `GET` the URL formed by appending `segments` to the base URL. Each
    /// segment is percent-encoded, so `/`, `?`, and `#` stay inside it.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get_segments<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        match self.segment_url(segments) {
            Ok(url) => self.request_url::<T, Value>(Method::GET, url, None).await,
            Err(error) => Err(self.report(&Method::GET, &self.base_url, error)),
        }
    }

    /// Base URL with `segments` appended as encoded path segments.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] if the base URL cannot carry a path.
    pub fn segment_url(&self, segments: &[&str]) -> Result<String, ApiError> {
        let request_failure = || ApiError::Request { message: normalize::REQUEST_FAILURE_MESSAGE.to_owned() };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| request_failure())?;
        url.path_segments_mut()
            .map_err(|()| request_failure())?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    async fn request_url<T, B>(&self, method: Method, url: String, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let result = self.send(method.clone(), &url, body).await.and_then(|data| {
            serde_json::from_value::<T>(data).map_err(ApiError::decode)
        });
        result.map_err(|error| self.report(&method, &url, error))
    }

    fn report(&self, method: &Method, url: &str, error: ApiError) -> ApiError {
        tracing::error!(%method, %url, code = error.error_code(), error = %error, "request failed");
        self.notifier.notify_error(error.message());
        error
    }

    /// `GET {base_url}{path}`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, Value>(Method::GET, path, None).await
    }

    /// `POST {base_url}{path}` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn send<B>(&self, method: Method, url: &str, body: Option<&B>) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        tracing::debug!(%method, %url, has_body = body.is_some(), "sending request");

        let mut request = self.http.request(method.clone(), url).headers(request_headers(&method));
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| ApiError::Request { message: format!("request body encode failed: {e}") })?;
            request = request.body(bytes);
        }

        let response = request.send().await.map_err(|e| normalize::transport_failure(&e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| normalize::transport_failure(&e))?;

        if !status.is_success() {
            let body = serde_json::from_slice::<Value>(&bytes).ok();
            return Err(normalize::normalize_http_failure(status.as_u16(), body.as_ref()));
        }

        let data = normalize::normalize_body(&bytes)?;
        tracing::info!(%method, %url, status = status.as_u16(), "received response");
        Ok(data)
    }
}

/// Headers the request interceptor adds for `method`.
///
/// POST, PUT, and PATCH always declare a JSON body; other methods get nothing.
#[must_use]
pub fn request_headers(method: &Method) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if *method == Method::POST || *method == Method::PUT || *method == Method::PATCH {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    headers
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

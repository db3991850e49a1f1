//! HTTP client abstraction for the catalog and identity adapters
//!
//! This module provides a small request/response interface over reqwest
//! which the authorizing pipeline decorates and tests replace with a
//! scripted mock.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;

/// Simple HTTP response structure for standardized response handling
#[derive(Debug, Clone)]
pub struct SimpleHttpResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

impl SimpleHttpResponse {
    /// Create a response with no headers
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header, ignoring names or values that cannot be encoded
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Parse the response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Check if the response is successful (status code 200-299)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the catalog rejected the credentials
    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }
}

/// HTTP client trait for abstracting HTTP requests
#[async_trait]
pub trait HttpClient: Send + Sync + Debug {
    /// Send an HTTP request with the specified method, URL, headers, and body
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: Option<HashMap<String, String>>,
        body: Option<String>,
    ) -> Result<SimpleHttpResponse>;

    /// Send a GET request
    async fn get(
        &self,
        url: &str,
        headers: Option<HashMap<String, String>>,
    ) -> Result<SimpleHttpResponse> {
        self.request("GET", url, headers, None).await
    }

    /// Send a POST request
    async fn post(
        &self,
        url: &str,
        headers: Option<HashMap<String, String>>,
        body: Option<String>,
    ) -> Result<SimpleHttpResponse> {
        self.request("POST", url, headers, body).await
    }

    /// Send a PUT request
    async fn put(
        &self,
        url: &str,
        headers: Option<HashMap<String, String>>,
        body: Option<String>,
    ) -> Result<SimpleHttpResponse> {
        self.request("PUT", url, headers, body).await
    }

    /// Send a DELETE request
    async fn delete(
        &self,
        url: &str,
        headers: Option<HashMap<String, String>>,
    ) -> Result<SimpleHttpResponse> {
        self.request("DELETE", url, headers, None).await
    }
}

/// Implementation of HttpClient using reqwest
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient with reqwest defaults
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a client with connect and whole-request timeouts
    pub fn with_timeouts(connect: Duration, request: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect)
            .timeout(request)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: Option<HashMap<String, String>>,
        body: Option<String>,
    ) -> Result<SimpleHttpResponse> {
        // Convert method string to reqwest Method
        let method = Method::from_str(method.to_uppercase().as_str())?;

        let mut request_builder = self.client.request(method, url);

        if let Some(headers) = headers {
            let mut header_map = HeaderMap::new();
            for (key, value) in headers {
                let header_name = HeaderName::from_str(&key).map_err(|e| Error::InvalidHeader {
                    name: key.clone(),
                    reason: e.to_string(),
                })?;
                let header_value =
                    HeaderValue::from_str(&value).map_err(|e| Error::InvalidHeader {
                        name: key.clone(),
                        reason: e.to_string(),
                    })?;
                header_map.insert(header_name, header_value);
            }
            request_builder = request_builder.headers(header_map);
        }

        if let Some(body) = body {
            request_builder = request_builder.body(body);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(SimpleHttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// A request seen by [`MockHttpClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Header lookup, case-insensitive on the name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Response(SimpleHttpResponse),
    Failure(String),
}

/// Mock HTTP client replaying scripted responses per URL.
///
/// Responses queued for a URL are served in order; the last one is sticky
/// and keeps being returned once the queue is down to it.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<parking_lot::RwLock<HashMap<String, VecDeque<Scripted>>>>,
    requests: Arc<parking_lot::Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new MockHttpClient
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a URL
    pub fn push_response(&self, url: &str, response: SimpleHttpResponse) {
        self.responses
            .write()
            .entry(url.to_string())
            .or_default()
            .push_back(Scripted::Response(response));
    }

    /// Queue a plain status/body response for a URL
    pub fn push_status(&self, url: &str, status: StatusCode, body: impl Into<String>) {
        self.push_response(url, SimpleHttpResponse::new(status, body));
    }

    /// Queue a JSON response for a URL
    pub fn push_json<T: serde::Serialize>(
        &self,
        url: &str,
        status: StatusCode,
        data: &T,
    ) -> Result<()> {
        let body = serde_json::to_string(data)?;
        self.push_response(
            url,
            SimpleHttpResponse::new(status, body).with_header("content-type", "application/json"),
        );
        Ok(())
    }

    /// Queue a transport failure for a URL
    pub fn push_failure(&self, url: &str, message: impl Into<String>) {
        self.responses
            .write()
            .entry(url.to_string())
            .or_default()
            .push_back(Scripted::Failure(message.into()));
    }

    /// Every request made so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests made so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Clear scripted responses and recorded requests
    pub fn clear(&self) {
        self.responses.write().clear();
        self.requests.lock().clear();
    }

    fn next_for(&self, url: &str) -> Option<Scripted> {
        let mut responses = self.responses.write();
        let queue = responses.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: Option<HashMap<String, String>>,
        body: Option<String>,
    ) -> Result<SimpleHttpResponse> {
        self.requests.lock().push(RecordedRequest {
            method: method.to_uppercase(),
            url: url.to_string(),
            headers: headers.unwrap_or_default(),
            body,
        });

        match self.next_for(url) {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Failure(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("No mock response for URL: {}", url)),
        }
    }
}

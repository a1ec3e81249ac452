//! HTTP transport seam for the rate-limited client.
//!
//! The request layer only needs a status code and a body back; hiding reqwest
//! behind this trait lets the retry logic run against scripted responses in
//! tests.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// HTTP method subset used by the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

/// A raw HTTP response: status plus unparsed body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport abstraction over the actual HTTP stack.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a single request. Transport-level failures (connect, TLS, ...)
    /// are errors; any received response is `Ok`, whatever its status.
    async fn send(
        &self,
        method: RequestMethod,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse>;
}

/// reqwest-backed transport carrying a fixed set of default headers.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from a header map (e.g. loaded from the
    /// request-headers JSON file).
    pub fn new(headers: &HashMap<String, String>) -> Result<Self> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name: {}", name))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {}", name))?;
            header_map.insert(name, value);
        }
        let client = reqwest::Client::builder()
            .default_headers(header_map)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        method: RequestMethod,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse> {
        let request = match method {
            RequestMethod::Get => self.client.get(url),
            RequestMethod::Post => {
                let request = self.client.post(url);
                match body {
                    Some(json) => request.json(json),
                    None => request,
                }
            }
        };
        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body from {}", url))?;
        Ok(HttpResponse { status, body })
    }
}

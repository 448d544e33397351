//! reqwest-backed transport
//!
//! This module handles all network requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Attaching the session cookie header
//! - Reporting redirects without following them
//! - Classifying transport failures

use crate::transport::{CookieSet, HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, COOKIE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Settings for the reqwest client
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// User agent sent with every request
    pub user_agent: String,

    /// Whole-request timeout
    pub timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("odata-harvest/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Transport over a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds the underlying client
    ///
    /// # Returns
    ///
    /// * `Ok(ReqwestTransport)` - Successfully built client
    /// * `Err(reqwest::Error)` - The TLS backend could not be initialized
    pub fn new(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::none())
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        cookies: &CookieSet,
    ) -> Result<HttpResponse, TransportError> {
        let url_str = request.url.to_string();
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());

        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                }
            })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            builder = builder.header(header_name, header_value);
        }

        if !cookies.is_empty() {
            let header_value = HeaderValue::from_str(&cookies.header_value()).map_err(|e| {
                TransportError::InvalidHeader {
                    name: COOKIE.to_string(),
                    message: e.to_string(),
                }
            })?;
            builder = builder.header(COOKIE, header_value);
        }

        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        tracing::debug!(method = %request.method, url = %url_str, "Sending request");

        let response = builder.send().await.map_err(|e| classify(&url_str, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&url_str, e))?
            .to_vec();

        tracing::debug!(status, url = %url_str, bytes = body.len(), "Received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
            url: final_url,
        })
    }
}

/// Maps a reqwest error onto the transport taxonomy
fn classify(url: &str, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        TransportError::Http {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

//! Raw HTTP transport
//!
//! This module defines the request/response values exchanged with the remote
//! service and the `Transport` seam the crawler and the authenticator talk
//! through. Redirects are never followed by a transport: session expiry is
//! only visible as a 3xx status, so callers must see it.

mod cookies;
mod expiry;
mod headers;
mod http_client;

pub use cookies::CookieSet;
pub use expiry::{ExpiryPolicy, StatusExpiry};
pub use headers::{find_header, headers_from_raw, headers_to_raw, HeaderList};
pub use http_client::{ReqwestTransport, TransportConfig};

use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;
use url::Url;

/// Errors raised while exchanging a request with the remote service
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },

    #[error("Invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },
}

impl TransportError {
    /// Returns true if repeating the request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connect { .. } | Self::Http { .. })
    }
}

/// An outgoing HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderList,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Creates a GET request with no headers and an empty body
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Creates a form-encoded POST request
    pub fn post_form<I, K, V>(url: Url, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish()
            .into_bytes();

        Self {
            method: Method::POST,
            url,
            headers: vec![(
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )],
            body,
        }
    }

    /// Adds a header, keeping any existing ones
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A response as seen by the crawler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderList,
    pub body: Vec<u8>,
    /// URL the response was served from
    pub url: Url,
}

impl HttpResponse {
    pub fn new(status: u16, url: Url) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            url,
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Every value of a header, in received order
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The redirect target, resolved against the response URL
    pub fn location(&self) -> Option<Url> {
        self.header("location")
            .and_then(|location| self.url.join(location).ok())
    }

    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests to the remote service
///
/// Implementations must report redirects as-is rather than following them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &HttpRequest,
        cookies: &CookieSet,
    ) -> Result<HttpResponse, TransportError>;
}

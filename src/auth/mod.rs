//! Single sign-on session authentication
//!
//! The target service sits behind a chain of identity providers. Signing in
//! takes three form submissions:
//! 1. The sign-in page is fetched and submitted with the credentials filled in
//! 2. The resulting token form is submitted unchanged to the next hop
//! 3. Step 2 is repeated once more, which yields the session cookies
//!
//! Only cookies issued for the parent domain of the service are kept.

mod form;
mod jar;

pub use form::{parse_form, LoginForm};
pub use jar::HandshakeJar;

use crate::transport::{CookieSet, HttpRequest, HttpResponse, Transport, TransportError};
use crate::UrlError;
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Redirect hops followed for a single handshake request
const MAX_REDIRECTS: usize = 10;

/// Form submissions after the sign-in page
const SUBMISSION_ROUNDS: usize = 3;

/// Errors raised while signing in
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unexpected HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("No form found on {url}")]
    MissingForm { url: String },

    #[error("Sign-in form has no field containing '{0}'")]
    MissingField(String),

    #[error("Handshake did not advance in round {round}: form action still {action:?}")]
    HandshakeStalled { round: usize, action: Option<String> },

    #[error("Invalid form action: {0}")]
    InvalidAction(String),

    #[error("Too many redirects starting at {url}")]
    TooManyRedirects { url: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Url(#[from] UrlError),
}

/// Produces a fresh session cookie set
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self) -> Result<CookieSet, AuthError>;
}

/// Authenticator that runs the identity-provider handshake over a transport
pub struct SsoAuthenticator {
    transport: Arc<dyn Transport>,
    login_url: Url,
    base_url: Url,
    username: String,
    password: String,
    user_agent: Option<String>,
}

impl SsoAuthenticator {
    pub fn new(
        transport: Arc<dyn Transport>,
        login_url: Url,
        base_url: Url,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            login_url,
            base_url,
            username: username.into(),
            password: password.into(),
            user_agent: None,
        }
    }

    /// Sends `user_agent` on every handshake request
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[async_trait]
impl Authenticator for SsoAuthenticator {
    async fn login(&self) -> Result<CookieSet, AuthError> {
        login(
            self.transport.as_ref(),
            &self.login_url,
            &self.base_url,
            &self.username,
            &self.password,
            self.user_agent.as_deref(),
        )
        .await
    }
}

/// Signs in and returns the cookies scoped to the parent domain of `base_url`
///
/// # Arguments
///
/// * `transport` - Transport used for every hop
/// * `login_url` - The sign-in page
/// * `base_url` - Base URL of the target service, used to scope cookies
/// * `username`, `password` - Credentials typed into the sign-in form
/// * `user_agent` - Optional User-Agent header
///
/// # Returns
///
/// * `Ok(CookieSet)` - The session cookies
/// * `Err(AuthError)` - The handshake failed; no partial cookies are returned
pub async fn login(
    transport: &dyn Transport,
    login_url: &Url,
    base_url: &Url,
    username: &str,
    password: &str,
    user_agent: Option<&str>,
) -> Result<CookieSet, AuthError> {
    let cookie_domain = crate::url::cookie_domain(base_url)?;
    let mut handshake = Handshake {
        transport,
        jar: HandshakeJar::new(),
        user_agent,
    };

    tracing::info!(login_url = %login_url, "Signing in");

    let page = handshake.fetch(HttpRequest::get(login_url.clone())).await?;
    let initial = parse_form(&page.text()).ok_or_else(|| AuthError::MissingForm {
        url: page.url.to_string(),
    })?;

    let username_field = initial
        .field_containing("Username")
        .ok_or_else(|| AuthError::MissingField("Username".to_string()))?
        .to_string();
    let password_field = initial
        .field_containing("Password")
        .ok_or_else(|| AuthError::MissingField("Password".to_string()))?
        .to_string();

    let mut form = initial.clone();
    let mut fields = initial.fields_with(&[
        (username_field.as_str(), username),
        (password_field.as_str(), password),
    ]);
    let mut page_url = page.url;

    for round in 1..=SUBMISSION_ROUNDS {
        let target = form.target(&page_url)?;
        tracing::debug!(round, target = %target, "Submitting sign-in form");

        let response = handshake
            .fetch(HttpRequest::post_form(target, fields))
            .await?;
        let next = parse_form(&response.text());
        let next_action = next.as_ref().and_then(|f| f.action.clone());

        if next.is_some() && next_action == form.action {
            return Err(AuthError::HandshakeStalled {
                round,
                action: next_action,
            });
        }

        if round == SUBMISSION_ROUNDS {
            if next.is_some() && next_action == initial.action {
                return Err(AuthError::HandshakeStalled {
                    round,
                    action: next_action,
                });
            }
            break;
        }

        form = next.ok_or_else(|| AuthError::MissingForm {
            url: response.url.to_string(),
        })?;
        fields = form.fields.clone();
        page_url = response.url;
    }

    let cookies = handshake.jar.scoped_to(&cookie_domain);
    tracing::info!(
        cookie_domain = %cookie_domain,
        kept = cookies.len(),
        received = handshake.jar.len(),
        "Signed in"
    );
    Ok(cookies)
}

struct Handshake<'a> {
    transport: &'a dyn Transport,
    jar: HandshakeJar,
    user_agent: Option<&'a str>,
}

impl Handshake<'_> {
    /// Sends a request, following redirects, and requires a 2xx at the end
    async fn fetch(&mut self, mut request: HttpRequest) -> Result<HttpResponse, AuthError> {
        let start = request.url.to_string();
        if let Some(user_agent) = self.user_agent {
            request = request.with_header("User-Agent", user_agent);
        }

        for _ in 0..=MAX_REDIRECTS {
            let cookies = self.jar.for_url(&request.url);
            let response = self.transport.send(&request, &cookies).await?;
            self.jar.record(&response);

            if response.is_redirect() {
                if let Some(location) = response.location() {
                    tracing::debug!(status = response.status, location = %location, "Following sign-in redirect");
                    request = redirected(request, response.status, location);
                    continue;
                }
            }

            if !response.is_success() {
                return Err(AuthError::Status {
                    url: response.url.to_string(),
                    status: response.status,
                });
            }
            return Ok(response);
        }

        Err(AuthError::TooManyRedirects { url: start })
    }
}

/// Builds the follow-up request for a redirect
///
/// 303, and 301/302 after a POST, switch to a body-less GET; 307 and 308
/// replay the request as-is.
fn redirected(request: HttpRequest, status: u16, location: Url) -> HttpRequest {
    let to_get = status == 303 || (matches!(status, 301 | 302) && request.method == Method::POST);
    if to_get {
        let mut next = HttpRequest::get(location);
        next.headers = request
            .headers
            .into_iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("content-type"))
            .collect();
        next
    } else {
        HttpRequest {
            url: location,
            ..request
        }
    }
}

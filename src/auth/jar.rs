use crate::transport::{CookieSet, HttpResponse};
use crate::url::{domain_matches, extract_domain, same_cookie_domain};
use cookie::Cookie;
use url::Url;

#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    /// `Domain` attribute, if the server sent one
    domain: Option<String>,
    /// Host that set the cookie
    origin: String,
}

impl StoredCookie {
    fn scope(&self) -> &str {
        self.domain.as_deref().unwrap_or(&self.origin)
    }

    fn applies_to(&self, host: &str) -> bool {
        match &self.domain {
            Some(domain) => domain_matches(host, domain),
            None => host.eq_ignore_ascii_case(&self.origin),
        }
    }
}

/// Cookie jar that lives for the duration of a single handshake
///
/// Identity providers hand out cookies on every hop; the jar replays them on
/// later hops to matching hosts and, once the handshake is over, yields the
/// subset that belongs to the target service.
#[derive(Debug, Default)]
pub struct HandshakeJar {
    cookies: Vec<StoredCookie>,
}

impl HandshakeJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every `Set-Cookie` header of a response
    ///
    /// Unparseable headers are skipped. A cookie with `Max-Age=0` removes any
    /// stored cookie with the same name and scope.
    pub fn record(&mut self, response: &HttpResponse) {
        let Some(origin) = extract_domain(&response.url) else {
            return;
        };

        for raw in response.header_values("set-cookie") {
            let parsed = match Cookie::parse(raw.to_string()) {
                Ok(cookie) => cookie,
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring malformed Set-Cookie header");
                    continue;
                }
            };

            let stored = StoredCookie {
                name: parsed.name().to_string(),
                value: parsed.value().to_string(),
                domain: parsed
                    .domain()
                    .filter(|d| !d.is_empty())
                    .map(|d| d.to_ascii_lowercase()),
                origin: origin.clone(),
            };

            self.cookies
                .retain(|c| !(c.name == stored.name && c.scope() == stored.scope()));

            let expired = parsed
                .max_age()
                .map(|age| age.is_zero() || age.is_negative())
                .unwrap_or(false);
            if !expired {
                self.cookies.push(stored);
            }
        }
    }

    /// Cookies to send with a request to `url`
    pub fn for_url(&self, url: &Url) -> CookieSet {
        let host = extract_domain(url).unwrap_or_default();
        let mut set = CookieSet::new(host.clone());
        for cookie in self.cookies.iter().filter(|c| c.applies_to(&host)) {
            set.insert(cookie.name.clone(), cookie.value.clone());
        }
        set
    }

    /// The cookies whose `Domain` attribute names `cookie_domain`
    ///
    /// Host-only cookies and cookies for any other domain are dropped.
    pub fn scoped_to(&self, cookie_domain: &str) -> CookieSet {
        let mut set = CookieSet::new(cookie_domain);
        for cookie in &self.cookies {
            match &cookie.domain {
                Some(domain) if same_cookie_domain(domain, cookie_domain) => {
                    set.insert(cookie.name.clone(), cookie.value.clone());
                }
                _ => {
                    tracing::debug!(
                        name = %cookie.name,
                        scope = %cookie.scope(),
                        "Dropping cookie outside the session domain"
                    );
                }
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

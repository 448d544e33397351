use crate::UrlError;
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use odata_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Computes the cookie domain that session cookies are scoped to
///
/// The leftmost label of the base URL's host is replaced with an empty label,
/// so `https://api.foo.example.com` yields `.foo.example.com`.
///
/// # Returns
///
/// * `Ok(String)` - The cookie domain, always starting with a dot
/// * `Err(UrlError)` - The URL has no host, or the host has a single label
///
/// # Examples
///
/// ```
/// use url::Url;
/// use odata_harvest::url::cookie_domain;
///
/// let url = Url::parse("http://flim.flam.example.com").unwrap();
/// assert_eq!(cookie_domain(&url).unwrap(), ".flam.example.com");
/// ```
pub fn cookie_domain(base_url: &Url) -> Result<String, UrlError> {
    let host = extract_domain(base_url).ok_or(UrlError::MissingDomain)?;

    match host.split_once('.') {
        Some((_, parent)) if !parent.is_empty() => Ok(format!(".{}", parent)),
        _ => Err(UrlError::NoParentDomain(host)),
    }
}

/// Returns true when a cookie's `Domain` attribute names the given cookie domain
///
/// The leading dot is insignificant on both sides (RFC 6265 ignores it).
pub fn same_cookie_domain(attribute: &str, cookie_domain: &str) -> bool {
    let attribute = attribute.trim_start_matches('.');
    let cookie_domain = cookie_domain.trim_start_matches('.');
    !attribute.is_empty() && attribute.eq_ignore_ascii_case(cookie_domain)
}

/// Returns true when `host` domain-matches `domain` (RFC 6265 §5.1.3)
pub fn domain_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    host.eq_ignore_ascii_case(domain)
        || (host.len() > domain.len()
            && host.to_ascii_lowercase().ends_with(&format!(".{}", domain.to_ascii_lowercase())))
}

use crate::UrlError;
use url::form_urlencoded;
use url::Url;

/// Canonicalizes a URL for request fingerprinting
///
/// Two URLs that address the same resource must canonicalize identically, so
/// only transformations that never change what the server returns are applied.
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP(S)
/// 3. Lowercase scheme and host, drop the default port (done by the parser)
/// 4. Remove the fragment
/// 5. Sort query parameters by key, then by value (blank values are kept)
/// 6. Remove an empty query string
///
/// The path is left untouched: OData keys such as `Set(guid'...')` are
/// case-sensitive and trailing slashes are significant on service roots.
///
/// # Examples
///
/// ```
/// use odata_harvest::url::canonicalize_url;
///
/// let url = canonicalize_url("HTTPS://API.Example.com/Set?$top=5&$skip=10#frag").unwrap();
/// assert_eq!(url.as_str(), "https://api.example.com/Set?%24skip=10&%24top=5");
/// ```
pub fn canonicalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();

        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Derives the object-store path segment for a URL
///
/// Scheme, host and query are stripped; empty, `.` and `..` segments are
/// dropped so the result is always a relative path that stays inside the
/// cache prefix. The service root (`/`) yields an empty string.
pub fn cache_path(url: &Url) -> String {
    url.path()
        .split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/")
}

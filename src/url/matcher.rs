/// Checks if a domain matches an allowed-domain pattern
///
/// Two kinds of patterns are supported:
/// 1. Exact match: "crm.example.com" matches only "crm.example.com"
/// 2. Wildcard match: "*.example.com" matches "example.com" and any subdomain
///
/// Both sides are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use odata_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("crm.example.com", "crm.example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

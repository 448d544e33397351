use crate::transport::HttpResponse;

/// Decides whether a response means the session has expired
///
/// The service never says so explicitly; an expired session shows up as a
/// redirect to the identity provider. Responses stored in the cache are
/// checked with their status and final URL only.
pub trait ExpiryPolicy: Send + Sync {
    fn is_expired(&self, response: &HttpResponse) -> bool;
}

/// Expiry detection by status code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusExpiry {
    /// Statuses that signal expiry; empty means every 3xx
    statuses: Vec<u16>,
}

impl StatusExpiry {
    /// Treats every redirect status as expiry
    pub fn any_redirect() -> Self {
        Self::default()
    }

    /// Treats exactly the given statuses as expiry
    ///
    /// An empty list falls back to every redirect status.
    pub fn with_statuses(statuses: impl Into<Vec<u16>>) -> Self {
        Self {
            statuses: statuses.into(),
        }
    }

    pub fn statuses(&self) -> &[u16] {
        &self.statuses
    }
}

impl ExpiryPolicy for StatusExpiry {
    fn is_expired(&self, response: &HttpResponse) -> bool {
        if self.statuses.is_empty() {
            response.is_redirect()
        } else {
            self.statuses.contains(&response.status)
        }
    }
}

//! Common types for the DnsSim environment abstraction.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use url::Url;

/// A domain name as used for cache lookups.
///
/// Treated as an opaque key: no normalisation happens here. Hosts that come
/// through `NetworkRequest::from_url` are already lower-cased by the URL
/// parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainName(String);

impl DomainName {
    /// Creates a domain name from any string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DomainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DomainName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for DomainName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for DomainName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Anything that names a domain which must be resolved before it can proceed.
pub trait Resolvable {
    /// The domain whose resolution gates this item.
    fn domain(&self) -> &DomainName;
}

impl Resolvable for DomainName {
    fn domain(&self) -> &DomainName {
        self
    }
}

impl<T: Resolvable + ?Sized> Resolvable for &T {
    fn domain(&self) -> &DomainName {
        (**self).domain()
    }
}

/// A simulated network request.
///
/// Only the host matters to the DNS model; the id and URL are carried for
/// reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRequest {
    /// Identifier unique within one simulated timeline
    pub request_id: u64,

    /// Full request URL
    pub url: String,

    /// Parsed host of `url`
    pub host: DomainName,
}

impl NetworkRequest {
    /// Creates a request for an already-known host.
    ///
    /// The URL is synthesised as `https://<host>/`.
    pub fn new(request_id: u64, host: impl Into<DomainName>) -> Self {
        let host = host.into();
        Self {
            request_id,
            url: format!("https://{}/", host),
            host,
        }
    }

    /// Creates a request by parsing `url` and taking its host.
    ///
    /// # Errors
    /// * `EnvError::InvalidUrl` - `url` is not an absolute URL
    /// * `EnvError::MissingHost` - the URL has no host (e.g. `data:` URLs)
    pub fn from_url(request_id: u64, url: &str) -> Result<Self, EnvError> {
        let parsed = Url::parse(url).map_err(|e| EnvError::invalid_url(url, e))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| EnvError::MissingHost(url.to_string()))?;

        Ok(Self {
            request_id,
            url: url.to_string(),
            host: DomainName::new(host),
        })
    }
}

impl Resolvable for NetworkRequest {
    fn domain(&self) -> &DomainName {
        &self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_extracts_host() {
        let req = NetworkRequest::from_url(7, "https://Cdn.Example.com:8443/app.js?v=2").unwrap();
        assert_eq!(req.request_id, 7);
        assert_eq!(req.domain().as_str(), "cdn.example.com");
        assert_eq!(req.url, "https://Cdn.Example.com:8443/app.js?v=2");
    }

    #[test]
    fn test_from_url_rejects_garbage() {
        let err = NetworkRequest::from_url(1, "not a url").unwrap_err();
        assert!(matches!(err, EnvError::InvalidUrl { .. }));
    }

    #[test]
    fn test_from_url_requires_host() {
        let err = NetworkRequest::from_url(1, "data:text/plain,hello").unwrap_err();
        assert_eq!(err, EnvError::MissingHost("data:text/plain,hello".to_string()));
    }

    #[test]
    fn test_new_synthesises_url() {
        let req = NetworkRequest::new(3, "a.com");
        assert_eq!(req.url, "https://a.com/");
        assert_eq!(req.host, DomainName::from("a.com"));
    }

    #[test]
    fn test_domain_name_is_opaque() {
        // No case folding outside the URL parser
        assert_ne!(DomainName::new("A.com"), DomainName::new("a.com"));
        assert_eq!(DomainName::new("a.com").to_string(), "a.com");
    }
}

//! Request identity and its content-addressed cache key.

use sha2::{Digest, Sha256};

use crate::http::ProxyRequest;

/// Compute the cache key for a request identity.
pub fn compute_cache_key(method: &str, url: &str, vary_headers: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(vary_headers.as_bytes());
    hex::encode(hasher.finalize())
}

/// Identity under which a response is stored: method, URL and any headers
/// the match has to take into account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity {
    pub method: String,
    pub url: String,
    pub vary: String,
    key: String,
}

impl RequestIdentity {
    pub fn new(method: &str, url: &str) -> Self {
        Self::with_vary(method, url, "")
    }

    pub fn with_vary(method: &str, url: &str, vary: &str) -> Self {
        let method = method.to_ascii_uppercase();
        let key = compute_cache_key(&method, url, vary);
        Self { method, url: url.to_string(), vary: vary.to_string(), key }
    }

    /// Identity of an intercepted request. Headers are not part of the match.
    pub fn of(request: &ProxyRequest) -> Self {
        Self::new(&request.method, request.url.as_str())
    }

    /// 64-char hex SHA-256 key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_key_stability() {
        let a = compute_cache_key("GET", "https://cours.local/app.js", "");
        let b = compute_cache_key("GET", "https://cours.local/app.js", "");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_different_method() {
        let get = RequestIdentity::new("GET", "https://cours.local/api/subjects");
        let post = RequestIdentity::new("POST", "https://cours.local/api/subjects");
        assert_ne!(get.key(), post.key());
    }

    #[test]
    fn test_key_different_vary() {
        let a = RequestIdentity::with_vary("GET", "https://cours.local/", "accept-language: fr");
        let b = RequestIdentity::with_vary("GET", "https://cours.local/", "accept-language: en");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_key_format() {
        let id = RequestIdentity::new("get", "https://cours.local/");
        assert_eq!(id.method, "GET");
        assert_eq!(id.key().len(), 64);
        assert!(id.key().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_identity_of_request_ignores_headers() {
        let url = Url::parse("https://cours.local/app.js").unwrap();
        let plain = ProxyRequest::get(url.clone());
        let with_header = ProxyRequest::get(url).with_header("Accept", "*/*");
        assert_eq!(RequestIdentity::of(&plain), RequestIdentity::of(&with_header));
    }
}

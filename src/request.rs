//! Incoming HTTP request type.

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use http::{HeaderMap, Uri};
use url::form_urlencoded;

use crate::method::{Method, UnknownMethod};

/// An incoming HTTP request with its body already collected.
///
/// Built by the server from the hyper request; tests and embedders build one
/// from any `http::Request<Bytes>` via [`Request::new`]. Cloning is cheap
/// apart from the header map; the body is reference-counted.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) received_at: Instant,
}

impl Request {
    /// Fails only when the method token is not a known [`Method`].
    pub fn new(req: http::Request<Bytes>) -> Result<Self, UnknownMethod> {
        let (parts, body) = req.into_parts();
        let method = Method::try_from(&parts.method)?;
        let query = parts.uri.query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Ok(Self {
            method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            query,
            params: HashMap::new(),
            received_at: Instant::now(),
        })
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn received_at(&self) -> Instant { self.received_at }

    /// Case-insensitive header lookup. Values that are not visible ASCII
    /// read as `None`; use [`headers`](Request::headers) for raw bytes.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/{resource}/{id}`, `req.param("id")` on `/posts/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// First decoded value of a query-string parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every decoded query-string pair, in request order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request {
        let req = http::Request::builder()
            .method("GET")
            .uri(uri)
            .header("Authorization", "Bearer x")
            .body(Bytes::new())
            .unwrap();
        Request::new(req).unwrap()
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request("/posts");
        assert_eq!(req.header("authorization"), Some("Bearer x"));
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer x"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn query_is_percent_decoded() {
        let req = request("/posts?title=hello%20world&tag=a&tag=b&callback=cb");
        assert_eq!(req.path(), "/posts");
        assert_eq!(req.query("title"), Some("hello world"));
        assert_eq!(req.query("tag"), Some("a"));
        assert_eq!(req.query_pairs().len(), 4);
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let req = http::Request::builder()
            .method("PROPFIND")
            .uri("/")
            .body(Bytes::new())
            .unwrap();
        assert!(Request::new(req).is_err());
    }
}

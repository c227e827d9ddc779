//! Response model and conversion to and from stored entries.

use std::borrow::Cow;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use shellcache_core::{CachedEntry, Error};

use super::Request;

/// A response, whether it came from the network, a cache, or a fallback.
///
/// Cloning is cheap: the body is reference counted.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// Whether the status is 2xx.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Snapshot this response as an entry of `cache_name` keyed by `request`.
    pub fn to_entry(&self, cache_name: &str, request: &Request) -> CachedEntry {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        CachedEntry::new(
            cache_name,
            request.method.as_str(),
            request.url.as_str(),
            self.status.as_u16(),
            headers,
            self.body.to_vec(),
        )
    }

    /// Rebuild a response from a stored entry.
    pub fn from_entry(entry: CachedEntry) -> Result<Self, Error> {
        let status = StatusCode::from_u16(entry.status_code)
            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", entry.url)))?;

        let mut headers = HeaderMap::with_capacity(entry.headers.len());
        for (name, value) in &entry.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::CorruptEntry(format!("{}: header {name}: {e}", entry.url)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::CorruptEntry(format!("{}: header value: {e}", entry.url)))?;
            headers.append(name, value);
        }

        Ok(Self { status, headers, body: Bytes::from(entry.body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn css_response() -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));
        headers.insert(header::ETAG, HeaderValue::from_static("\"abc\""));
        Response::new(StatusCode::OK, headers, "body{}")
    }

    #[test]
    fn test_ok() {
        assert!(css_response().ok());
        assert!(!Response::new(StatusCode::NOT_FOUND, HeaderMap::new(), "").ok());
    }

    #[test]
    fn test_entry_round_trip_keeps_headers() {
        let request = Request::get(Url::parse("https://example.com/css/main.css").unwrap());
        let entry = css_response().to_entry("struct-site-v1", &request);

        assert_eq!(entry.key_hash, request.key());
        assert_eq!(entry.content_type.as_deref(), Some("text/css"));

        let restored = Response::from_entry(entry).unwrap();
        assert_eq!(restored.status, StatusCode::OK);
        assert_eq!(restored.header("etag"), Some("\"abc\""));
        assert_eq!(restored.text(), "body{}");
    }

    #[test]
    fn test_from_entry_rejects_bad_status() {
        let mut entry = CachedEntry::new("c", "GET", "https://example.com/", 200, Vec::new(), Vec::new());
        entry.status_code = 42;
        assert!(matches!(Response::from_entry(entry), Err(Error::CorruptEntry(_))));
    }
}

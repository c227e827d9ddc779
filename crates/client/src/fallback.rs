//! Synthesized responses for when neither cache nor network can answer.

use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;

use crate::fetch::Response;

pub const OFFLINE_BODY: &str = "Offline - Content not available";

fn svg_response(svg: String) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/svg+xml"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Response::new(StatusCode::OK, headers, svg)
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Last path segment of `url`, or an empty string for a bare directory.
/// The query string is never part of the label.
pub fn file_name(url: &Url) -> &str {
    url.path_segments().and_then(|mut segments| segments.next_back()).unwrap_or_default()
}

/// 400x300 card standing in for any image.
pub fn image_placeholder() -> Response {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300" viewBox="0 0 400 300">
  <rect width="400" height="300" fill="#2a2a2a"/>
  <rect x="20" y="20" width="360" height="260" fill="#1a1a1a" stroke="#444" stroke-width="2" rx="4"/>
  <text x="200" y="140" text-anchor="middle" fill="#666" font-family="Arial, sans-serif" font-size="18">Image Offline</text>
  <text x="200" y="170" text-anchor="middle" fill="#888" font-family="Arial, sans-serif" font-size="14">Content not available</text>
</svg>
"##;
    svg_response(svg.to_string())
}

/// 800x450 card naming the demo file that could not be loaded.
pub fn demo_placeholder(url: &Url) -> Response {
    let name = escape_xml(file_name(url));
    let svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="800" height="450" viewBox="0 0 800 450">
  <rect width="800" height="450" fill="#1a1a1a"/>
  <rect x="50" y="50" width="700" height="350" fill="#2a2a2a" stroke="#333" stroke-width="2" rx="8"/>
  <text x="400" y="200" text-anchor="middle" fill="#666" font-family="Arial, sans-serif" font-size="24">Demo: {name}</text>
  <text x="400" y="250" text-anchor="middle" fill="#888" font-family="Arial, sans-serif" font-size="16">Offline - Demo not available</text>
  <circle cx="400" cy="300" r="20" fill="none" stroke="#666" stroke-width="2"/>
  <path d="M390 300 L400 290 L410 300 L400 310 Z" fill="#666"/>
</svg>
"##
    );
    svg_response(svg)
}

/// Terminal `503 Service Unavailable`.
pub fn offline_response() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    Response::new(StatusCode::SERVICE_UNAVAILABLE, headers, OFFLINE_BODY)
}

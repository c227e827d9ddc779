//! URL canonicalization for stable request keys.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an absolute URL string so equal requests share one key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an http(s) scheme
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    normalize(parsed)
}

/// Resolve a manifest entry or page-relative path against `origin`.
///
/// Absolute inputs are canonicalized as-is; `/path` inputs are joined onto
/// the origin.
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if trimmed.contains("://") {
        return canonicalize(trimmed);
    }

    let joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    normalize(joined)
}

fn normalize(mut parsed: Url) -> Result<Url, UrlError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

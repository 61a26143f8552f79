use url::Url;

use crate::api::error::ApiError;

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Derive the push-channel URL from the REST base URL (same host, ws
/// scheme).
pub fn push_url(base_url: &str) -> Result<Url, ApiError> {
    let mut url =
        Url::parse(&normalize_url(base_url)).map_err(|e| ApiError::Config(e.to_string()))?;
    let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
    url.set_scheme(scheme)
        .map_err(|_| ApiError::Config(format!("cannot derive push url from {base_url}")))?;
    Ok(url)
}
